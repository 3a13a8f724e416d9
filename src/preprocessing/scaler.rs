//! Min-max feature scaling

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    min: f64,
    range: f64,
}

/// Scales numeric columns to [0, 1] with each column's own min and max
///
/// Columns with zero range map to 0. Nulls pass through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    params: Vec<(String, ScalerParams)>,
    is_fitted: bool,
}

impl MinMaxScaler {
    /// Create an unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn min and range of each listed column
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.params.clear();

        for col_name in columns {
            let values = numeric_values(df, col_name)?;
            let (min, max) = values
                .iter()
                .flatten()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });

            let params = if min.is_finite() && max.is_finite() {
                let range = max - min;
                ScalerParams {
                    min,
                    range: if range == 0.0 { 1.0 } else { range },
                }
            } else {
                // All-null column
                ScalerParams { min: 0.0, range: 1.0 }
            };
            self.params.push((col_name.clone(), params));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Produce one scaled `Float64` column per fitted column, in fit order
    pub fn transform(&self, df: &DataFrame) -> Result<Vec<Column>> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        self.params
            .iter()
            .map(|(col_name, params)| {
                let scaled: Vec<Option<f64>> = numeric_values(df, col_name)?
                    .into_iter()
                    .map(|opt| opt.map(|v| (v - params.min) / params.range))
                    .collect();
                Ok(Column::new(col_name.as_str().into(), scaled))
            })
            .collect()
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<Vec<Column>> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted (min, max) of a column
    pub fn data_range(&self, column: &str) -> Option<(f64, f64)> {
        self.params
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, p)| (p.min, p.min + p.range))
    }
}

fn numeric_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(col_name)
        .map_err(|_| PipelineError::Schema(format!("column '{}' not found", col_name)))?;
    let as_f64 = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::Schema(format!("column '{}' is not numeric: {}", col_name, e)))?;
    let values = as_f64
        .f64()
        .map_err(|e| PipelineError::Data(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}
