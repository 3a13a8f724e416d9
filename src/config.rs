//! Project configuration
//!
//! Values come from three layers: built-in defaults, environment
//! overrides (`HEARTFLOW_DATA_DIR`, `HEARTFLOW_PROJECT`) and the JSON
//! parameters file (`conf/parameters.json`).

use crate::error::Result;
use crate::pipeline::Catalog;
use crate::processing::ProcessingParams;
use crate::tracking::RunConfig;
use crate::training::{Criterion, MaxFeatures};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default location of the parameters file
pub const DEFAULT_PARAMS_PATH: &str = "conf/parameters.json";

/// Name of the label column in the heart-disease data
pub const DEFAULT_LABEL_COLUMN: &str = "HeartDisease";

/// Configuration for one invocation of the pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used to group tracked runs
    pub project: String,
    /// Root of the data directory layout
    pub data_dir: PathBuf,
    /// Parameters of the processing stage
    pub input_param: ProcessingParams,
    /// Run configuration handed to the run context
    pub run_config: Option<RunConfig>,
    /// Label column consumed by the training pipeline
    pub label_column: String,
    /// Worker threads for forest fitting
    pub n_jobs: usize,
    /// Split criterion of the forest (`gini` or `entropy`)
    pub criterion: Criterion,
    /// Features scanned per split (`sqrt`, `log2`, `all`, a count or a fraction)
    pub max_features: MaxFeatures,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project: std::env::var("HEARTFLOW_PROJECT")
                .unwrap_or_else(|_| "heartflow".to_string()),
            data_dir: std::env::var("HEARTFLOW_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            input_param: ProcessingParams::default(),
            run_config: None,
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            n_jobs: 1,
            criterion: Criterion::Gini,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

impl ProjectConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the parameters file, falling back to defaults when it is absent
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            warn!(path = %path.display(), "parameters file not found, using defaults");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        info!(path = %path.display(), project = %config.project, "loaded parameters");
        Ok(config)
    }

    /// Builder method to set the row limit
    pub fn with_n_rows(mut self, n_rows: usize) -> Self {
        self.input_param.n_rows = Some(n_rows);
        self
    }

    /// Builder method to set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Builder method to set the run configuration
    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = Some(run_config);
        self
    }

    /// Builder method to set the split criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Builder method to set the per-split feature strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Builder method to set the project name
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Dataset catalog rooted at the data directory
    pub fn catalog(&self) -> Catalog {
        Catalog::from_data_dir(&self.data_dir)
    }

    /// Directory holding tracked runs
    pub fn tracking_dir(&self) -> PathBuf {
        self.data_dir.join("08_reporting").join("runs")
    }
}
