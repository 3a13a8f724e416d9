//! heartflow - heart-disease classification workflow
//!
//! This crate provides a small, reproducible modeling workflow:
//! - Processing of the raw records (row limit, null removal, categoricals)
//! - Modeling preparation (min-max scaling, one-hot encoding)
//! - A seeded random forest with a fixed 80/20 split
//! - Accuracy and ROC-AUC evaluation reported to a tracked run
//! - Gaussian-process hyperparameter sweeps
//!
//! # Modules
//!
//! ## Stages
//! - [`processing`] - Truncation and null removal
//! - [`preprocessing`] - Scaling, encoding and label coercion
//! - [`training`] - Split, random forest, metrics
//!
//! ## Orchestration
//! - [`pipeline`] - Catalog, pipelines and registry
//! - [`tracking`] - Run contexts, local run store, sweeps
//! - [`optimizer`] - Search spaces and samplers used by sweeps
//!
//! ## Infrastructure
//! - [`io`] - CSV datasets
//! - [`config`] - Parameters file and environment overrides
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Stages
pub mod io;
pub mod processing;
pub mod preprocessing;
pub mod training;

// Orchestration
pub mod optimizer;
pub mod tracking;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Configuration and data
    pub use crate::config::ProjectConfig;
    pub use crate::io::CsvDataset;

    // Stages
    pub use crate::processing::{drop_null_data, load_and_truncate_data, ProcessingParams};
    pub use crate::preprocessing::{prepare_for_modeling, PrepareOptions};
    pub use crate::training::{
        evaluate_model, split_data, train_model, EvaluationMetrics, RandomForest, SplitData,
        TrainingOptions,
    };

    // Orchestration
    pub use crate::pipeline::{
        Catalog, PipelineName, PipelineRegistry, ProcessingPipeline, TrainingPipeline,
    };
    pub use crate::tracking::{
        ExperimentTracker, Hyperparameters, RunContext, StaticRunContext, Sweep, SweepConfig,
    };
}
