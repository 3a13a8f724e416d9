//! CSV-backed dataset

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options applied when reading the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvLoadArgs {
    /// Field separator
    pub separator: u8,
    /// First line holds column names
    pub has_header: bool,
    /// Rows used for dtype inference
    pub infer_schema_length: usize,
}

impl Default for CsvLoadArgs {
    fn default() -> Self {
        Self {
            separator: b',',
            has_header: true,
            infer_schema_length: 1000,
        }
    }
}

/// Options applied when writing the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvSaveArgs {
    /// Field separator
    pub separator: u8,
    /// Write a header line
    pub include_header: bool,
}

impl Default for CsvSaveArgs {
    fn default() -> Self {
        Self {
            separator: b',',
            include_header: true,
        }
    }
}

/// Serializable description of a dataset entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDescription {
    pub filepath: PathBuf,
    pub load_args: CsvLoadArgs,
    pub save_args: CsvSaveArgs,
}

/// A CSV file on disk that loads into and saves from a [`DataFrame`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvDataset {
    filepath: PathBuf,
    load_args: CsvLoadArgs,
    save_args: CsvSaveArgs,
}

impl CsvDataset {
    /// Create a dataset entry for the given path
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
            load_args: CsvLoadArgs::default(),
            save_args: CsvSaveArgs::default(),
        }
    }

    /// Set read options
    pub fn with_load_args(mut self, load_args: CsvLoadArgs) -> Self {
        self.load_args = load_args;
        self
    }

    /// Set write options
    pub fn with_save_args(mut self, save_args: CsvSaveArgs) -> Self {
        self.save_args = save_args;
        self
    }

    /// Path of the backing file
    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// Read the whole file
    pub fn load(&self) -> Result<DataFrame> {
        let file = File::open(&self.filepath).map_err(|e| {
            PipelineError::Data(format!("cannot open {}: {}", self.filepath.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default()
            .with_separator(self.load_args.separator);

        let df = CsvReadOptions::default()
            .with_has_header(self.load_args.has_header)
            .with_infer_schema_length(Some(self.load_args.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PipelineError::Data(e.to_string()))?;

        debug!(
            path = %self.filepath.display(),
            rows = df.height(),
            cols = df.width(),
            "loaded csv dataset"
        );
        Ok(df)
    }

    /// Write the frame, replacing any existing file
    pub fn save(&self, df: &mut DataFrame) -> Result<()> {
        if let Some(parent) = self.filepath.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(&self.filepath)?;
        CsvWriter::new(&mut file)
            .include_header(self.save_args.include_header)
            .with_separator(self.save_args.separator)
            .finish(df)
            .map_err(|e| PipelineError::Data(e.to_string()))?;

        debug!(
            path = %self.filepath.display(),
            rows = df.height(),
            cols = df.width(),
            "saved csv dataset"
        );
        Ok(())
    }

    /// Whether the backing file is present
    pub fn exists(&self) -> bool {
        self.filepath.is_file()
    }

    pub fn describe(&self) -> DatasetDescription {
        DatasetDescription {
            filepath: self.filepath.clone(),
            load_args: self.load_args.clone(),
            save_args: self.save_args.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("heartflow_test_csv")
            .join(format!("{}_{}.csv", name, std::process::id()))
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save_load");
        let dataset = CsvDataset::new(&path);

        let mut df = df!(
            "id" => &[1i64, 2, 3],
            "Sex" => &["M", "F", "M"],
            "Age" => &[40.0, 49.0, 37.0]
        )
        .unwrap();

        dataset.save(&mut df).unwrap();
        assert!(dataset.exists());

        let loaded = dataset.load().unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 3);
        assert_eq!(
            loaded.column("Sex").unwrap().str().unwrap().get(1),
            Some("F")
        );

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let dataset = CsvDataset::new(temp_path("does_not_exist"));
        assert!(!dataset.exists());
        assert!(matches!(dataset.load(), Err(PipelineError::Data(_))));
    }

    #[test]
    fn test_empty_fields_load_as_nulls() {
        let path = temp_path("nulls");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "id,Cholesterol\n1,289\n2,\n3,283\n").unwrap();

        let df = CsvDataset::new(&path).load().unwrap();
        assert_eq!(df.column("Cholesterol").unwrap().null_count(), 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_describe() {
        let dataset = CsvDataset::new("data/01_raw/heart.csv")
            .with_load_args(CsvLoadArgs { separator: b';', ..Default::default() });
        let desc = dataset.describe();
        assert_eq!(desc.filepath, PathBuf::from("data/01_raw/heart.csv"));
        assert_eq!(desc.load_args.separator, b';');
        assert!(desc.save_args.include_header);
    }
}
