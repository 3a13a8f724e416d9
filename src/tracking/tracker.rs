//! Experiment tracker implementation

use crate::error::{PipelineError, Result};
use super::storage::{LocalStorage, StorageBackend};
use super::{Hyperparameters, RunConfig, RunContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A single metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    /// Index of the `log_metrics` call that produced it
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub project: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    /// Configuration the run was started with
    pub config: RunConfig,
    /// Latest value of each metric
    pub metrics: BTreeMap<String, f64>,
    pub metrics_history: Vec<Metric>,
    /// Failure message of a failed run
    #[serde(default)]
    pub error: Option<String>,
}

impl Run {
    /// Create a new running run
    pub fn new(project: impl Into<String>, run_name: impl Into<String>, config: RunConfig) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            run_name: run_name.into(),
            project: project.into(),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            config,
            metrics: BTreeMap::new(),
            metrics_history: Vec::new(),
            error: None,
        }
    }

    /// Run duration in seconds, up to now for a running run
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// A run backed by a storage backend; every change is written through
pub struct LocalRun {
    run: Run,
    storage: Arc<dyn StorageBackend>,
    step: u64,
}

impl LocalRun {
    pub fn run(&self) -> &Run {
        &self.run
    }

    pub fn id(&self) -> &str {
        &self.run.run_id
    }

    /// Latest logged value of a metric
    pub fn latest_metric(&self, name: &str) -> Option<f64> {
        self.run.metric(name)
    }

    /// Mark the run finished and persist it
    pub fn finish(mut self) -> Result<Run> {
        self.close(RunStatus::Finished, None)?;
        info!(run_id = %self.run.run_id, duration_secs = self.run.duration_secs(), "run finished");
        Ok(self.run)
    }

    /// Mark the run failed with `reason` and persist it
    pub fn fail(mut self, reason: impl Into<String>) -> Result<Run> {
        let reason = reason.into();
        self.close(RunStatus::Failed, Some(reason.clone()))?;
        info!(run_id = %self.run.run_id, error = %reason, "run failed");
        Ok(self.run)
    }

    fn close(&mut self, status: RunStatus, error: Option<String>) -> Result<()> {
        self.run.status = status;
        self.run.end_time = Some(Utc::now());
        self.run.error = error;
        self.storage.save_run(&self.run)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.run.status != RunStatus::Running {
            return Err(PipelineError::Configuration(format!(
                "run '{}' is not active",
                self.run.run_id
            )));
        }
        Ok(())
    }
}

impl RunContext for LocalRun {
    fn hyperparameters(&self) -> Result<Hyperparameters> {
        self.ensure_active()?;
        Hyperparameters::from_config(&self.run.config)
    }

    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        self.ensure_active()?;

        let timestamp = Utc::now();
        for (name, &value) in metrics {
            self.run.metrics.insert(name.clone(), value);
            self.run.metrics_history.push(Metric {
                name: name.clone(),
                value,
                step: self.step,
                timestamp,
            });
        }
        self.step += 1;

        debug!(run_id = %self.run.run_id, ?metrics, "logged metrics");
        self.storage.save_run(&self.run)
    }
}

/// Creates runs for one project and queries their history
pub struct ExperimentTracker {
    project: String,
    storage: Arc<dyn StorageBackend>,
}

impl ExperimentTracker {
    /// Tracker writing JSON runs under `output_dir`
    pub fn new(project: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self::with_storage(project, Arc::new(LocalStorage::new(output_dir)))
    }

    pub fn with_storage(project: impl Into<String>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            project: project.into(),
            storage,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Start a run with a generated name
    pub fn init(&self, config: RunConfig) -> Result<LocalRun> {
        let name = format!("run-{}", Utc::now().format("%Y%m%d-%H%M%S%3f"));
        self.init_named(name, config)
    }

    /// Start a named run
    pub fn init_named(&self, run_name: impl Into<String>, config: RunConfig) -> Result<LocalRun> {
        let run = Run::new(self.project.clone(), run_name, config);
        self.storage.save_run(&run)?;

        info!(
            project = %self.project,
            run_id = %run.run_id,
            run_name = %run.run_name,
            "run started"
        );
        Ok(LocalRun {
            run,
            storage: Arc::clone(&self.storage),
            step: 0,
        })
    }

    /// All runs of the project, oldest first
    pub fn runs(&self) -> Result<Vec<Run>> {
        self.storage.load_runs(&self.project)
    }

    /// Remove a stored run; an unknown id is a tracking error
    pub fn delete_run(&self, run_id: &str) -> Result<()> {
        self.storage.delete_run(&self.project, run_id)?;
        info!(project = %self.project, run_id, "deleted run");
        Ok(())
    }

    /// Finished run with the best value of `metric`
    pub fn best_run(&self, metric: &str, maximize: bool) -> Result<Option<Run>> {
        let best = self
            .runs()?
            .into_iter()
            .filter(|r| r.status == RunStatus::Finished)
            .filter_map(|r| r.metric(metric).map(|v| (v, r)))
            .max_by(|(a, _), (b, _)| if maximize { a.total_cmp(b) } else { b.total_cmp(a) })
            .map(|(_, r)| r);
        Ok(best)
    }
}
