//! Train/test split of a prepared table

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Share of rows held out for testing
pub const TEST_SIZE: f64 = 0.2;

/// Seed of the row permutation
pub const SPLIT_SEED: u64 = 42;

/// Feature matrix and label vector extracted from a prepared table
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Every column except `label` becomes a feature, in table order.
    /// All values must be numeric and non-null.
    pub fn from_frame(df: &DataFrame, label: &str) -> Result<Self> {
        let label_column = df
            .column(label)
            .map_err(|_| PipelineError::Schema(format!("label column '{}' not found", label)))?;

        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != label)
            .map(|name| name.to_string())
            .collect();

        let n_rows = df.height();
        let mut x = Array2::<f64>::zeros((n_rows, feature_names.len()));
        for (j, name) in feature_names.iter().enumerate() {
            let values = column_as_f64(df.column(name)?)?;
            for (i, v) in values.into_iter().enumerate() {
                x[[i, j]] = v;
            }
        }

        let y = Array1::from_vec(column_as_f64(label_column)?);

        Ok(Self { x, y, feature_names })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// The four aligned outputs of [`split_data`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitData {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    pub feature_names: Vec<String>,
}

impl SplitData {
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Split a prepared table 80/20 into train and test sets.
///
/// Rows are shuffled with a ChaCha8 generator seeded with [`SPLIT_SEED`];
/// the first `ceil(0.2 * n)` shuffled rows form the test set and the rest
/// the training set. No stratification is applied.
pub fn split_data(df: &DataFrame, label: &str) -> Result<SplitData> {
    let dataset = Dataset::from_frame(df, label)?;
    split_dataset(&dataset, TEST_SIZE, SPLIT_SEED)
}

/// Split an extracted dataset with an explicit test share and seed
pub fn split_dataset(dataset: &Dataset, test_size: f64, seed: u64) -> Result<SplitData> {
    let n = dataset.n_samples();
    if n < 2 {
        return Err(PipelineError::InsufficientData { required: 2, actual: n });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }

    let n_test = ((test_size * n as f64).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let (test_idx, train_idx) = indices.split_at(n_test);

    debug!(n_train = train_idx.len(), n_test = test_idx.len(), seed, "split data");

    Ok(SplitData {
        x_train: dataset.x.select(Axis(0), train_idx),
        x_test: dataset.x.select(Axis(0), test_idx),
        y_train: dataset.y.select(Axis(0), train_idx),
        y_test: dataset.y.select(Axis(0), test_idx),
        feature_names: dataset.feature_names.clone(),
    })
}

fn column_as_f64(column: &Column) -> Result<Vec<f64>> {
    let name = column.name().to_string();
    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::Schema(format!("column '{}' is not numeric: {}", name, e)))?;
    cast.f64()
        .map_err(|e| PipelineError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.ok_or_else(|| PipelineError::Data(format!("column '{}' contains nulls", name))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(n: usize) -> DataFrame {
        let a: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let b: Vec<i32> = (0..n).map(|i| (i % 2) as i32).collect();
        let label: Vec<i32> = (0..n).map(|i| (i % 2) as i32).collect();
        df!("Age" => a, "Sex_M" => b, "HeartDisease" => label).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let split = split_data(&prepared(10), "HeartDisease").unwrap();
        assert_eq!(split.n_test(), 2);
        assert_eq!(split.n_train(), 8);
        assert_eq!(split.feature_names, vec!["Age".to_string(), "Sex_M".to_string()]);
        assert_eq!(split.x_train.ncols(), 2);
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let split = split_data(&prepared(11), "HeartDisease").unwrap();
        assert_eq!(split.n_test(), 3);
        assert_eq!(split.n_train(), 8);
    }

    #[test]
    fn test_split_is_deterministic() {
        let df = prepared(25);
        let a = split_data(&df, "HeartDisease").unwrap();
        let b = split_data(&df, "HeartDisease").unwrap();

        assert_eq!(a.x_train, b.x_train);
        assert_eq!(a.y_test, b.y_test);
    }

    #[test]
    fn test_rows_stay_aligned() {
        let split = split_data(&prepared(20), "HeartDisease").unwrap();
        // Sex_M equals the label in every row
        for (row, y) in split.x_train.rows().into_iter().zip(split.y_train.iter()) {
            assert_eq!(row[1], *y);
        }
    }

    #[test]
    fn test_too_few_rows() {
        let err = split_data(&prepared(1), "HeartDisease").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData { required: 2, actual: 1 }
        ));
    }

    #[test]
    fn test_two_rows() {
        let split = split_data(&prepared(2), "HeartDisease").unwrap();
        assert_eq!(split.n_test(), 1);
        assert_eq!(split.n_train(), 1);
    }
}
