//! Modeling preparation
//!
//! Turns a cleaned record table into a fully numeric table:
//! - Min-max scaling of numeric features
//! - One-hot encoding of categorical features
//! - Integer coercion of the binary label

mod scaler;
mod encoder;
mod pipeline;

pub use scaler::MinMaxScaler;
pub use encoder::OneHotEncoder;
pub use pipeline::{prepare_for_modeling, coerce_label, PrepareOptions};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column type tag, derived from a column's dtype on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    /// Classify a dtype; everything that is not a primitive number
    /// (strings, categoricals, booleans) is categorical
    pub fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
            DataType::Float32 | DataType::Float64 => ColumnType::Numeric,
            _ => ColumnType::Categorical,
        }
    }
}

/// Split column names into (numeric, categorical), keeping their order
pub fn partition_columns(df: &DataFrame, columns: &[String]) -> (Vec<String>, Vec<String>) {
    columns
        .iter()
        .filter_map(|name| df.column(name).ok().map(|c| (name, ColumnType::of(c.dtype()))))
        .fold((Vec::new(), Vec::new()), |(mut num, mut cat), (name, kind)| {
            match kind {
                ColumnType::Numeric => num.push(name.clone()),
                ColumnType::Categorical => cat.push(name.clone()),
            }
            (num, cat)
        })
}
