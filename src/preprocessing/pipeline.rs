//! Modeling-prep stage

use crate::config::DEFAULT_LABEL_COLUMN;
use crate::error::{PipelineError, Result};
use super::{partition_columns, MinMaxScaler, OneHotEncoder};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Options for [`prepare_for_modeling`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareOptions {
    /// Name of the binary label column
    pub label_column: String,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
        }
    }
}

impl PrepareOptions {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
        }
    }
}

/// Build the table the model is fitted on.
///
/// The first column is treated as an identifier and the last column as the
/// label slot; everything in between except the label column itself is a
/// feature. Numeric features are min-max scaled, categorical features are
/// one-hot encoded, and the label is coerced to 0/1. The result holds the
/// scaled columns, then the indicator columns, then the label, in the
/// input's row order. Scaling and encoding state is refit on every call.
pub fn prepare_for_modeling(df: &DataFrame, options: &PrepareOptions) -> Result<DataFrame> {
    let start = Instant::now();
    let label = options.label_column.as_str();

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let label_column = df
        .column(label)
        .map_err(|_| PipelineError::Schema(format!("label column '{}' not found", label)))?;

    let features: Vec<String> = if names.len() > 2 {
        names[1..names.len() - 1]
            .iter()
            .filter(|name| name.as_str() != label)
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    if features.is_empty() {
        return Err(PipelineError::Schema(format!(
            "no feature columns between the identifier and '{}' (columns: {:?})",
            label, names
        )));
    }

    let (numeric, categorical) = partition_columns(df, &features);

    let mut scaler = MinMaxScaler::new();
    let scaled = scaler.fit_transform(df, &numeric)?;

    let mut encoder = OneHotEncoder::new();
    let encoded = encoder.fit_transform(df, &categorical)?;

    let label_values = coerce_label(label_column)?;

    let mut columns = scaled;
    columns.extend(encoded);
    columns.push(Column::new(label.into(), label_values));

    let prepared = DataFrame::new(columns).map_err(|e| PipelineError::Data(e.to_string()))?;

    debug!(
        numeric = numeric.len(),
        categorical = categorical.len(),
        output_cols = prepared.width(),
        rows = prepared.height(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "prepared data for modeling"
    );

    Ok(prepared)
}

/// Coerce a label column to 0/1.
///
/// Accepts integers and floats equal to 0 or 1, booleans, and the strings
/// `0`, `1`, `true`, `false` (any case). Nulls and any other value are a
/// schema error.
pub fn coerce_label(column: &Column) -> Result<Vec<i32>> {
    let name = column.name().to_string();
    let non_binary = |value: String| {
        PipelineError::Schema(format!(
            "label column '{}' is not binary: found value {}",
            name, value
        ))
    };
    let null_label = || PipelineError::Schema(format!("label column '{}' contains nulls", name));

    match column.dtype() {
        DataType::Boolean => column
            .bool()
            .map_err(|e| PipelineError::Data(e.to_string()))?
            .into_iter()
            .map(|v| v.map(i32::from).ok_or_else(null_label))
            .collect(),
        DataType::String | DataType::Categorical(_, _) => {
            let as_str = column
                .cast(&DataType::String)
                .map_err(|e| PipelineError::Data(e.to_string()))?;
            as_str
                .str()
                .map_err(|e| PipelineError::Data(e.to_string()))?
                .into_iter()
                .map(|v| {
                    let v = v.ok_or_else(null_label)?;
                    match v.trim().to_ascii_lowercase().as_str() {
                        "1" | "1.0" | "true" => Ok(1),
                        "0" | "0.0" | "false" => Ok(0),
                        _ => Err(non_binary(format!("'{}'", v))),
                    }
                })
                .collect()
        }
        _ => {
            let as_f64 = column
                .cast(&DataType::Float64)
                .map_err(|e| PipelineError::Schema(format!("label column '{}': {}", name, e)))?;
            as_f64
                .f64()
                .map_err(|e| PipelineError::Data(e.to_string()))?
                .into_iter()
                .map(|v| match v.ok_or_else(null_label)? {
                    x if x == 0.0 => Ok(0),
                    x if x == 1.0 => Ok(1),
                    x => Err(non_binary(x.to_string())),
                })
                .collect()
        }
    }
}
