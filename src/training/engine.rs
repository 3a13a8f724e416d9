//! Train and evaluate stages

use crate::error::Result;
use crate::tracking::{Hyperparameters, RunContext};
use super::decision_tree::Criterion;
use super::metrics::EvaluationMetrics;
use super::random_forest::{MaxFeatures, RandomForest};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Seed of the forest
pub const MODEL_SEED: u64 = 0;

/// Options of the train stage that are not hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Worker threads used to grow trees
    pub n_jobs: usize,
    /// Forest seed
    pub random_state: u64,
    /// Split impurity criterion
    pub criterion: Criterion,
    /// Features scanned per split
    pub max_features: MaxFeatures,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            n_jobs: 1,
            random_state: MODEL_SEED,
            criterion: Criterion::Gini,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

impl TrainingOptions {
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs.max(1);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }
}

/// Fit a random forest with the given hyperparameters and write it to
/// `model_path`, replacing any earlier model there.
pub fn train_model(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    hyperparameters: &Hyperparameters,
    model_path: &Path,
    options: &TrainingOptions,
) -> Result<RandomForest> {
    let start = Instant::now();

    let model = RandomForest::builder(hyperparameters.n_estimators)
        .with_max_depth(hyperparameters.max_depth)
        .with_random_state(options.random_state)
        .with_n_jobs(options.n_jobs)
        .with_criterion(options.criterion)
        .with_max_features(options.max_features)
        .fit(x_train, y_train)?;

    model.save(model_path)?;

    info!(
        n_estimators = hyperparameters.n_estimators,
        max_depth = hyperparameters.max_depth,
        criterion = %options.criterion,
        max_features = %options.max_features,
        n_samples = x_train.nrows(),
        path = %model_path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "trained model"
    );
    Ok(model)
}

/// Score the model on the held-out rows, print and log both metrics, and
/// report them to the run context.
pub fn evaluate_model(
    model: &RandomForest,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    run: &mut dyn RunContext,
) -> Result<EvaluationMetrics> {
    let y_pred = model.predict(x_test)?;
    let y_score = model.predict_positive_proba(x_test)?;

    let metrics = EvaluationMetrics::compute(y_test, &y_pred, &y_score)?;

    println!("ROC AUC: {:.3}", metrics.roc_auc);
    println!("Accuracy: {:.3}", metrics.accuracy);

    info!("Model has an accuracy of {:.3} on test data.", metrics.accuracy);
    info!("Model has an ROC AUC of {:.3} on test data.", metrics.roc_auc);

    run.log_metrics(&metrics.to_map())?;
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::tracking::StaticRunContext;
    use ndarray::array;

    fn temp_model(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join("heartflow_test_engine")
            .join(format!("{}_{}.bin", name, std::process::id()))
    }

    #[test]
    fn test_train_writes_model() {
        let x = array![[0.0], [0.1], [0.9], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let path = temp_model("train");
        let hp = Hyperparameters { n_estimators: 5, max_depth: 3 };

        let model = train_model(&x, &y, &hp, &path, &TrainingOptions::default()).unwrap();
        assert_eq!(model.n_trees(), 5);

        let loaded = RandomForest::load(&path).unwrap();
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_train_uses_forest_options() {
        let x = array![[0.0, 1.0], [0.1, 0.8], [0.9, 0.2], [1.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let path = temp_model("options");
        let hp = Hyperparameters { n_estimators: 4, max_depth: 2 };
        let options = TrainingOptions::default()
            .with_criterion(Criterion::Entropy)
            .with_max_features(MaxFeatures::All);

        let model = train_model(&x, &y, &hp, &path, &options).unwrap();
        assert_eq!(model.config().criterion, Criterion::Entropy);
        assert_eq!(model.config().max_features, MaxFeatures::All);

        let loaded = RandomForest::load(&path).unwrap();
        assert_eq!(loaded.config(), model.config());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_evaluate_logs_metrics() {
        let x = array![[0.0], [0.1], [0.2], [0.8], [0.9], [1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let model = RandomForest::builder(10)
            .with_max_features(MaxFeatures::All)
            .with_bootstrap(false)
            .fit(&x, &y)
            .unwrap();

        let mut run = StaticRunContext::new(Hyperparameters { n_estimators: 10, max_depth: 3 });
        let metrics = evaluate_model(&model, &x, &y, &mut run).unwrap();

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.roc_auc, 1.0);
        assert_eq!(run.logged().len(), 1);
        assert_eq!(run.logged()[0].get("roc_auc"), Some(&1.0));
    }

    #[test]
    fn test_evaluate_single_class() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let model = RandomForest::builder(3).fit(&x, &y).unwrap();

        let mut run = StaticRunContext::new(Hyperparameters { n_estimators: 3, max_depth: 2 });
        let err = evaluate_model(&model, &array![[0.0], [0.5]], &array![1.0, 1.0], &mut run)
            .unwrap_err();

        assert!(matches!(err, PipelineError::Evaluation(_)));
        assert!(run.logged().is_empty());
    }
}
