//! Pipeline wiring
//!
//! Stages are plain functions; the pipelines here compose them in order,
//! reading and writing the datasets named in the [`Catalog`]. Every stage
//! runs inside [`run_node`] so its timing and failures show up in the logs.

mod catalog;
mod processing;
mod training;

pub use catalog::Catalog;
pub use processing::{ProcessingPipeline, PROCESSING_NODES};
pub use training::{TrainingOutcome, TrainingPipeline, TRAINING_NODES};

use crate::config::ProjectConfig;
use crate::error::{PipelineError, Result};
use crate::preprocessing::PrepareOptions;
use crate::processing::ProcessingParams;
use crate::tracking::{RunContext, Sweep, SweepSummary};
use crate::training::TrainingOptions;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info, info_span};

/// Run one stage inside a span, logging its duration or its failure
pub fn run_node<T, F>(name: &str, node: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let span = info_span!("node", name);
    let _guard = span.enter();
    let start = Instant::now();
    info!("Running node: {}", name);

    match node() {
        Ok(value) => {
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completed node: {}", name
            );
            Ok(value)
        }
        Err(e) => {
            error!(error = %e, "Node {} failed", name);
            Err(e)
        }
    }
}

/// Registered pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineName {
    Processing,
    Training,
    /// Processing followed by training
    Default,
}

impl PipelineName {
    pub const ALL: [PipelineName; 3] = [
        PipelineName::Processing,
        PipelineName::Training,
        PipelineName::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineName::Processing => "processing",
            PipelineName::Training => "training",
            PipelineName::Default => "default",
        }
    }

    /// Whether the pipeline needs an active run context
    pub fn needs_run(&self) -> bool {
        !matches!(self, PipelineName::Processing)
    }

    /// Node names in execution order
    pub fn nodes(&self) -> Vec<&'static str> {
        match self {
            PipelineName::Processing => PROCESSING_NODES.to_vec(),
            PipelineName::Training => TRAINING_NODES.to_vec(),
            PipelineName::Default => PROCESSING_NODES
                .iter()
                .chain(TRAINING_NODES.iter())
                .copied()
                .collect(),
        }
    }
}

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "processing" => Ok(PipelineName::Processing),
            "training" => Ok(PipelineName::Training),
            "default" | "__default__" => Ok(PipelineName::Default),
            other => Err(PipelineError::Configuration(format!(
                "unknown pipeline '{}', expected one of processing, training, default",
                other
            ))),
        }
    }
}

/// What a pipeline run produced
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub processed: Option<DataFrame>,
    pub training: Option<TrainingOutcome>,
}

/// Resolves pipeline names to runnable pipelines
#[derive(Debug, Clone)]
pub struct PipelineRegistry {
    catalog: Catalog,
    params: ProcessingParams,
    processing: ProcessingPipeline,
    training: TrainingPipeline,
}

impl PipelineRegistry {
    pub fn new(catalog: Catalog, params: ProcessingParams, training: TrainingPipeline) -> Self {
        Self {
            catalog,
            params,
            processing: ProcessingPipeline::new(),
            training,
        }
    }

    /// Registry wired from the project configuration
    pub fn from_config(config: &ProjectConfig) -> Self {
        let prepare = PrepareOptions {
            label_column: config.label_column.clone(),
        };
        let options = TrainingOptions::default()
            .with_n_jobs(config.n_jobs)
            .with_criterion(config.criterion)
            .with_max_features(config.max_features);
        Self::new(
            config.catalog(),
            config.input_param.clone(),
            TrainingPipeline::new(prepare, options),
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn training(&self) -> &TrainingPipeline {
        &self.training
    }

    /// Run a pipeline by name.
    ///
    /// Pipelines that train need `run`; without it they fail with a
    /// configuration error before any stage executes.
    pub fn run(
        &self,
        name: PipelineName,
        run: Option<&mut dyn RunContext>,
    ) -> Result<PipelineOutput> {
        info!(pipeline = %name, "Running pipeline");
        let start = Instant::now();

        let output = match name {
            PipelineName::Processing => PipelineOutput {
                processed: Some(self.processing.run(&self.catalog, &self.params)?),
                training: None,
            },
            PipelineName::Training => {
                let run = require_run(run)?;
                PipelineOutput {
                    processed: None,
                    training: Some(self.training.run_from_catalog(&self.catalog, run)?),
                }
            }
            PipelineName::Default => {
                let run = require_run(run)?;
                let processed = self.processing.run(&self.catalog, &self.params)?;
                let outcome = self.training.run(&self.catalog, &processed, run)?;
                PipelineOutput {
                    processed: Some(processed),
                    training: Some(outcome),
                }
            }
        };

        info!(
            pipeline = %name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline completed"
        );
        Ok(output)
    }

    /// Process the raw data once, then run `count` sweep trials over the
    /// processed table
    pub fn sweep(&self, sweep: &Sweep<'_>, count: usize) -> Result<SweepSummary> {
        let processed = self.processing.run(&self.catalog, &self.params)?;
        info!(
            rows = processed.height(),
            sweep = %sweep.config().name,
            "Sweeping over processed data"
        );
        sweep.run(count, |run| {
            self.training.run(&self.catalog, &processed, run).map(|_| ())
        })
    }
}

fn require_run(run: Option<&mut dyn RunContext>) -> Result<&mut dyn RunContext> {
    run.ok_or_else(|| PipelineError::Configuration("no active run context".to_string()))
}
