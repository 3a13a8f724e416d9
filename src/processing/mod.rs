//! Processing stage
//!
//! Cleans the raw heart-disease table before modeling:
//! 1. The six categorical fields are cast to `Categorical`
//! 2. The table is truncated to the configured row count and snapshotted
//! 3. Rows with any null are dropped and a constant marker column is added

use crate::error::{PipelineError, Result};
use crate::io::CsvDataset;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fields of the raw table that hold category codes
pub const CATEGORICAL_COLUMNS: [&str; 6] = [
    "Sex",
    "ChestPainType",
    "FastingBS",
    "RestingECG",
    "ExerciseAngina",
    "ST_Slope",
];

/// Name of the constant column appended after null dropping
pub const MARKER_COLUMN: &str = "dummy_col";

/// Parameters of the processing stage (`input_param` in the parameters file)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingParams {
    /// Row limit applied before null dropping
    #[serde(default)]
    pub n_rows: Option<usize>,
}

impl ProcessingParams {
    pub fn new(n_rows: usize) -> Self {
        Self { n_rows: Some(n_rows) }
    }

    /// The configured row limit; absent or zero is a configuration error
    pub fn row_limit(&self) -> Result<usize> {
        match self.n_rows {
            Some(0) => Err(PipelineError::Configuration(
                "input_param.n_rows must be a positive integer".to_string(),
            )),
            Some(n) => Ok(n),
            None => Err(PipelineError::Configuration(
                "input_param.n_rows is not set".to_string(),
            )),
        }
    }
}

/// Cast the categorical fields, keep the first `n_rows` rows and write the
/// result to `intermediate`.
///
/// A row limit above the table height keeps every row.
pub fn load_and_truncate_data(
    mut data: DataFrame,
    params: &ProcessingParams,
    intermediate: &CsvDataset,
) -> Result<DataFrame> {
    let n_rows = params.row_limit()?;
    cast_categorical(&mut data)?;

    let mut truncated = data.head(Some(n_rows));
    intermediate.save(&mut truncated)?;

    info!(
        rows = truncated.height(),
        n_rows,
        path = %intermediate.filepath().display(),
        "truncated input data"
    );
    Ok(truncated)
}

/// Cast the six categorical fields to `Categorical` in place.
///
/// Also applied when a processed table is read back from CSV, where the
/// integer-coded `FastingBS` would otherwise come back numeric.
pub fn cast_categorical(data: &mut DataFrame) -> Result<()> {
    for name in CATEGORICAL_COLUMNS {
        let categorical = as_categorical(data, name)?;
        data.with_column(categorical)?;
    }
    Ok(())
}

/// Remove every row holding a null in any column, then append the
/// constant marker column.
pub fn drop_null_data(data: DataFrame) -> Result<DataFrame> {
    let before = data.height();

    let mask = data.get_columns().iter().fold(
        BooleanChunked::full("mask".into(), true, before),
        |mask, column| &mask & &column.as_materialized_series().is_not_null(),
    );
    let mut cleaned = data.filter(&mask)?;

    let marker = Column::new(MARKER_COLUMN.into(), vec![0i32; cleaned.height()]);
    cleaned.with_column(marker)?;

    debug!(
        dropped = before - cleaned.height(),
        remaining = cleaned.height(),
        "dropped rows with nulls"
    );
    Ok(cleaned)
}

/// Both halves of the stage in order
pub fn process(
    data: DataFrame,
    params: &ProcessingParams,
    intermediate: &CsvDataset,
) -> Result<DataFrame> {
    let truncated = load_and_truncate_data(data, params, intermediate)?;
    drop_null_data(truncated)
}

fn as_categorical(data: &DataFrame, name: &str) -> Result<Column> {
    let column = data
        .column(name)
        .map_err(|_| PipelineError::Schema(format!("column '{}' not found", name)))?;

    // Integer codes (FastingBS) cannot be cast to Categorical directly
    column
        .cast(&DataType::String)
        .and_then(|c| c.cast(&DataType::Categorical(None, CategoricalOrdering::Physical)))
        .map_err(|e| PipelineError::Schema(format!("column '{}' is not categorical: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn raw_table() -> DataFrame {
        df!(
            "id" => &[1i64, 2, 3, 4, 5],
            "Age" => &[Some(40i64), Some(49), None, Some(54), Some(39)],
            "Sex" => &["M", "F", "M", "F", "M"],
            "ChestPainType" => &["ATA", "NAP", "ATA", "ASY", "NAP"],
            "RestingBP" => &[140i64, 160, 130, 138, 150],
            "FastingBS" => &[0i64, 0, 0, 1, 0],
            "RestingECG" => &["Normal", "Normal", "ST", "Normal", "Normal"],
            "ExerciseAngina" => &["N", "N", "N", "Y", "N"],
            "ST_Slope" => &["Up", "Flat", "Up", "Flat", "Up"],
            "HeartDisease" => &[0i64, 1, 0, 1, 0]
        )
        .unwrap()
    }

    fn temp_dataset(name: &str) -> (CsvDataset, PathBuf) {
        let dir = std::env::temp_dir()
            .join("heartflow_test_processing")
            .join(format!("{}_{}", name, std::process::id()));
        (CsvDataset::new(dir.join("heart_prepared.csv")), dir)
    }

    #[test]
    fn test_row_limit() {
        assert_eq!(ProcessingParams::new(10).row_limit().unwrap(), 10);
        assert!(matches!(
            ProcessingParams::default().row_limit(),
            Err(PipelineError::Configuration(_))
        ));
        assert!(matches!(
            ProcessingParams { n_rows: Some(0) }.row_limit(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_truncate_and_snapshot() {
        let (intermediate, dir) = temp_dataset("truncate");

        let out = load_and_truncate_data(raw_table(), &ProcessingParams::new(3), &intermediate)
            .unwrap();

        assert_eq!(out.height(), 3);
        assert!(matches!(
            out.column("Sex").unwrap().dtype(),
            DataType::Categorical(_, _)
        ));
        assert!(matches!(
            out.column("FastingBS").unwrap().dtype(),
            DataType::Categorical(_, _)
        ));
        assert!(intermediate.exists());
        assert_eq!(intermediate.load().unwrap().height(), 3);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_categorical_column() {
        let (intermediate, _) = temp_dataset("missing");
        let df = raw_table().drop("ST_Slope").unwrap();

        let err = load_and_truncate_data(df, &ProcessingParams::new(5), &intermediate).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
        assert!(!intermediate.exists());
    }

    #[test]
    fn test_cast_categorical_restores_integer_codes() {
        let mut df = raw_table();
        cast_categorical(&mut df).unwrap();

        for name in CATEGORICAL_COLUMNS {
            assert!(matches!(
                df.column(name).unwrap().dtype(),
                DataType::Categorical(_, _)
            ));
        }
        assert_eq!(df.column("Age").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_drop_null_data() {
        let out = drop_null_data(raw_table()).unwrap();

        assert_eq!(out.height(), 4);
        for column in out.get_columns() {
            assert_eq!(column.null_count(), 0);
        }
        let marker = out.column(MARKER_COLUMN).unwrap().i32().unwrap();
        assert!(marker.into_iter().all(|v| v == Some(0)));
    }

    #[test]
    fn test_process_row_bound() {
        let (intermediate, dir) = temp_dataset("bound");

        let out = process(raw_table(), &ProcessingParams::new(100), &intermediate).unwrap();
        assert_eq!(out.height(), 4);
        assert_eq!(intermediate.load().unwrap().height(), 5);

        let _ = std::fs::remove_dir_all(dir);
    }
}
