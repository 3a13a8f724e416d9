//! Dataset catalog

use crate::io::{CsvDataset, DatasetDescription};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Every artifact the pipelines read or write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Raw heart-disease records
    pub raw: CsvDataset,
    /// Truncated snapshot written by the processing stage
    pub intermediate: CsvDataset,
    /// Output of the processing pipeline
    pub processed: CsvDataset,
    /// Fitted model file
    pub model_path: PathBuf,
}

impl Catalog {
    /// Standard layout under a data directory
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            raw: CsvDataset::new(data_dir.join("01_raw").join("heart.csv")),
            intermediate: CsvDataset::new(data_dir.join("03_primary").join("heart_prepared.csv")),
            processed: CsvDataset::new(data_dir.join("04_feature").join("heart_processed.csv")),
            model_path: data_dir.join("07_model_output").join("model.bin"),
        }
    }

    /// Named descriptions of the CSV entries
    pub fn datasets(&self) -> Vec<(&'static str, DatasetDescription)> {
        vec![
            ("raw", self.raw.describe()),
            ("intermediate", self.intermediate.describe()),
            ("processed", self.processed.describe()),
        ]
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_data_dir("data")
    }
}
