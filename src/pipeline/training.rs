//! Training pipeline

use crate::error::Result;
use crate::preprocessing::{prepare_for_modeling, PrepareOptions};
use crate::processing::cast_categorical;
use crate::tracking::{Hyperparameters, RunContext};
use crate::training::{
    evaluate_model, split_data, train_model, EvaluationMetrics, RandomForest, TrainingOptions,
};
use super::{run_node, Catalog};
use polars::prelude::*;
use std::path::PathBuf;

/// Nodes in execution order
pub const TRAINING_NODES: [&str; 5] = [
    "prepare_data_for_modeling",
    "split_data",
    "experiment_tracking",
    "train_model",
    "evaluate_model",
];

/// What one training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub hyperparameters: Hyperparameters,
    pub metrics: EvaluationMetrics,
    pub model: RandomForest,
    pub model_path: PathBuf,
    pub feature_names: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingOutcome {
    /// Features ordered by importance, highest first
    pub fn top_features(&self, n: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.model.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

/// prepare -> split -> hyperparameters -> train -> evaluate
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    prepare: PrepareOptions,
    options: TrainingOptions,
}

impl TrainingPipeline {
    pub fn new(prepare: PrepareOptions, options: TrainingOptions) -> Self {
        Self { prepare, options }
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    /// Run every node on `table`, reporting metrics to `run`
    pub fn run(
        &self,
        catalog: &Catalog,
        table: &DataFrame,
        run: &mut dyn RunContext,
    ) -> Result<TrainingOutcome> {
        let label = self.prepare.label_column.as_str();

        let prepared = run_node(TRAINING_NODES[0], || prepare_for_modeling(table, &self.prepare))?;
        let split = run_node(TRAINING_NODES[1], || split_data(&prepared, label))?;
        let hyperparameters = run_node(TRAINING_NODES[2], || run.hyperparameters())?;
        let model = run_node(TRAINING_NODES[3], || {
            train_model(
                &split.x_train,
                &split.y_train,
                &hyperparameters,
                &catalog.model_path,
                &self.options,
            )
        })?;
        let metrics = run_node(TRAINING_NODES[4], || {
            evaluate_model(&model, &split.x_test, &split.y_test, run)
        })?;

        Ok(TrainingOutcome {
            hyperparameters,
            metrics,
            model,
            model_path: catalog.model_path.clone(),
            feature_names: split.feature_names.clone(),
            n_train: split.n_train(),
            n_test: split.n_test(),
        })
    }

    /// Load the processed dataset from the catalog and run on it.
    ///
    /// The categorical fields are re-cast after loading so the model sees
    /// the same layout as when training follows processing in memory.
    pub fn run_from_catalog(
        &self,
        catalog: &Catalog,
        run: &mut dyn RunContext,
    ) -> Result<TrainingOutcome> {
        let table = run_node("load_processed_data", || {
            let mut table = catalog.processed.load()?;
            cast_categorical(&mut table)?;
            Ok(table)
        })?;
        self.run(catalog, &table, run)
    }
}
