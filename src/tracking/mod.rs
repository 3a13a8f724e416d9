//! Experiment tracking
//!
//! A run context hands hyperparameters to the train stage and receives the
//! evaluation metrics. [`LocalRun`] persists runs as JSON files;
//! [`StaticRunContext`] keeps everything in memory.

mod storage;
mod tracker;
pub mod sweep;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{ExperimentTracker, LocalRun, Metric, Run, RunStatus};
pub use sweep::{
    ParameterRange, Sweep, SweepConfig, SweepMethod, SweepMetric, SweepSummary, SweepTrial,
    DEFAULT_SWEEP_COUNT,
};

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Configuration attached to a run (`run_config` in the parameters file)
pub type RunConfig = BTreeMap<String, Value>;

/// The two hyperparameters of the train stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: usize,
}

impl Hyperparameters {
    /// Read both values from a run configuration.
    ///
    /// Each must be a positive integer; integral floats such as `50.0` are
    /// accepted, anything else is a configuration error.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Ok(Self {
            n_estimators: positive_int(config, "n_estimators")?,
            max_depth: positive_int(config, "max_depth")?,
        })
    }

    pub fn to_config(&self) -> RunConfig {
        RunConfig::from([
            ("n_estimators".to_string(), Value::from(self.n_estimators)),
            ("max_depth".to_string(), Value::from(self.max_depth)),
        ])
    }
}

fn positive_int(config: &RunConfig, key: &str) -> Result<usize> {
    let value = config
        .get(key)
        .ok_or_else(|| PipelineError::Configuration(format!("run config has no '{}'", key)))?;

    let parsed = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64));

    match parsed {
        Some(n) if n > 0 => Ok(n as usize),
        _ => Err(PipelineError::Configuration(format!(
            "run config '{}' must be a positive integer, got {}",
            key, value
        ))),
    }
}

/// Run-scoped configuration and metric sink
pub trait RunContext {
    /// Hyperparameters of the active run
    fn hyperparameters(&self) -> Result<Hyperparameters>;

    /// Record one set of metrics for the active run
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()>;
}

/// In-memory run context with fixed hyperparameters
#[derive(Debug, Clone, Default)]
pub struct StaticRunContext {
    config: RunConfig,
    logged: Vec<BTreeMap<String, f64>>,
    finished: bool,
}

impl StaticRunContext {
    pub fn new(hyperparameters: Hyperparameters) -> Self {
        Self::from_config(hyperparameters.to_config())
    }

    pub fn from_config(config: RunConfig) -> Self {
        Self {
            config,
            logged: Vec::new(),
            finished: false,
        }
    }

    /// Close the run; later calls fail with a configuration error
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Every metrics map logged so far
    pub fn logged(&self) -> &[BTreeMap<String, f64>] {
        &self.logged
    }

    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            return Err(PipelineError::Configuration("no active run".to_string()));
        }
        Ok(())
    }
}

impl RunContext for StaticRunContext {
    fn hyperparameters(&self) -> Result<Hyperparameters> {
        self.ensure_active()?;
        Hyperparameters::from_config(&self.config)
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        self.ensure_active()?;
        self.logged.push(metrics.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hyperparameters_from_config() {
        let config: RunConfig =
            serde_json::from_value(json!({"n_estimators": 100, "max_depth": 5})).unwrap();
        let hp = Hyperparameters::from_config(&config).unwrap();
        assert_eq!(hp, Hyperparameters { n_estimators: 100, max_depth: 5 });
    }

    #[test]
    fn test_missing_value() {
        let config: RunConfig = serde_json::from_value(json!({"n_estimators": 100})).unwrap();
        assert!(matches!(
            Hyperparameters::from_config(&config),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_non_positive_value() {
        let config: RunConfig =
            serde_json::from_value(json!({"n_estimators": 0, "max_depth": 5})).unwrap();
        assert!(Hyperparameters::from_config(&config).is_err());

        let config: RunConfig =
            serde_json::from_value(json!({"n_estimators": "ten", "max_depth": 5})).unwrap();
        assert!(Hyperparameters::from_config(&config).is_err());
    }

    #[test]
    fn test_integral_float_accepted() {
        let config: RunConfig =
            serde_json::from_value(json!({"n_estimators": 50.0, "max_depth": 4})).unwrap();
        assert_eq!(Hyperparameters::from_config(&config).unwrap().n_estimators, 50);
    }

    #[test]
    fn test_finished_context() {
        let mut run = StaticRunContext::new(Hyperparameters { n_estimators: 10, max_depth: 3 });
        assert!(run.hyperparameters().is_ok());

        run.finish();
        assert!(matches!(run.hyperparameters(), Err(PipelineError::Configuration(_))));
        assert!(run.log_metrics(&BTreeMap::new()).is_err());
    }
}
