//! Integration test: full pipeline (raw CSV → processing → training → tracked run)

use heartflow::config::ProjectConfig;
use heartflow::error::PipelineError;
use heartflow::pipeline::{PipelineName, PipelineRegistry};
use heartflow::tracking::{ExperimentTracker, Hyperparameters, RunStatus, StaticRunContext};
use heartflow::training::RandomForest;
use polars::prelude::*;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join("heartflow_it_full")
        .join(format!("{}_{}", name, std::process::id()))
}

/// Ten records, five positive and five negative
fn ten_records() -> DataFrame {
    let label: Vec<i64> = (0..10).map(|i| i % 2).collect();

    df!(
        "id" => (1..=10i64).collect::<Vec<_>>(),
        "Age" => &[40i64, 49, 37, 48, 54, 39, 45, 58, 42, 61],
        "Sex" => &["M", "F", "M", "F", "M", "M", "F", "M", "F", "M"],
        "ChestPainType" => &["ATA", "NAP", "ATA", "ASY", "NAP", "NAP", "ATA", "ASY", "TA", "ASY"],
        "RestingBP" => &[140i64, 160, 130, 138, 150, 120, 130, 136, 118, 148],
        "Cholesterol" => &[289i64, 180, 283, 214, 195, 339, 237, 164, 211, 260],
        "FastingBS" => &[0i64, 0, 0, 0, 0, 0, 0, 1, 0, 1],
        "RestingECG" => &["Normal", "Normal", "ST", "Normal", "Normal", "Normal", "Normal", "ST", "LVH", "LVH"],
        "MaxHR" => &[172i64, 116, 168, 108, 170, 112, 165, 99, 174, 104],
        "ExerciseAngina" => &["N", "Y", "N", "Y", "N", "Y", "N", "Y", "N", "Y"],
        "Oldpeak" => &[0.0f64, 1.4, 0.0, 1.5, 0.2, 1.8, 0.0, 2.0, 0.1, 2.5],
        "ST_Slope" => &["Up", "Flat", "Up", "Flat", "Up", "Flat", "Up", "Flat", "Up", "Flat"],
        "HeartDisease" => label
    )
    .unwrap()
}

fn setup(name: &str, n_rows: usize) -> (ProjectConfig, PathBuf) {
    let dir = temp_dir(name);
    let config = ProjectConfig::new()
        .with_data_dir(&dir)
        .with_project("heartflow-it")
        .with_n_rows(n_rows)
        .with_run_config(Hyperparameters { n_estimators: 10, max_depth: 3 }.to_config());
    config.catalog().raw.save(&mut ten_records()).unwrap();
    (config, dir)
}

#[test]
fn test_default_pipeline_on_ten_rows() {
    let (config, dir) = setup("default", 10);
    let registry = PipelineRegistry::from_config(&config);

    let mut run = StaticRunContext::new(Hyperparameters { n_estimators: 10, max_depth: 3 });
    let output = registry.run(PipelineName::Default, Some(&mut run)).unwrap();

    let processed = output.processed.unwrap();
    assert_eq!(processed.height(), 10);

    let outcome = output.training.unwrap();
    assert_eq!(outcome.n_train, 8);
    assert_eq!(outcome.n_test, 2);
    assert!((0.0..=1.0).contains(&outcome.metrics.accuracy));
    assert!((0.0..=1.0).contains(&outcome.metrics.roc_auc));

    let catalog = registry.catalog();
    assert!(catalog.model_path.is_file());
    assert!(catalog.intermediate.exists());
    assert!(catalog.processed.exists());

    let model = RandomForest::load(&catalog.model_path).unwrap();
    assert_eq!(model.n_trees(), 10);
    assert_eq!(model.n_features(), outcome.feature_names.len());

    assert_eq!(run.logged().len(), 1);
    let logged = &run.logged()[0];
    assert_eq!(logged.get("accuracy"), Some(&outcome.metrics.accuracy));
    assert_eq!(logged.get("roc_auc"), Some(&outcome.metrics.roc_auc));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_training_pipeline_with_tracked_run() {
    let (config, dir) = setup("tracked", 10);
    let registry = PipelineRegistry::from_config(&config);
    registry.run(PipelineName::Processing, None).unwrap();

    let tracker = ExperimentTracker::new(config.project.clone(), config.tracking_dir());
    let mut run = tracker.init(config.run_config.clone().unwrap()).unwrap();
    let output = registry.run(PipelineName::Training, Some(&mut run)).unwrap();
    let record = run.finish().unwrap();

    let outcome = output.training.unwrap();
    assert_eq!(outcome.hyperparameters, Hyperparameters { n_estimators: 10, max_depth: 3 });
    assert_eq!(record.status, RunStatus::Finished);
    assert_eq!(record.metric("roc_auc"), Some(outcome.metrics.roc_auc));
    assert_eq!(record.metric("accuracy"), Some(outcome.metrics.accuracy));

    let stored = tracker.runs().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].run_id, record.run_id);
    assert_eq!(stored[0].metrics_history.len(), 2);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_training_alone_matches_default_feature_layout() {
    let (config, dir) = setup("layout", 10);
    let registry = PipelineRegistry::from_config(&config);
    let hp = Hyperparameters { n_estimators: 10, max_depth: 3 };

    let mut first = StaticRunContext::new(hp);
    let default = registry.run(PipelineName::Default, Some(&mut first)).unwrap();
    let mut second = StaticRunContext::new(hp);
    let training = registry.run(PipelineName::Training, Some(&mut second)).unwrap();

    let default = default.training.unwrap();
    let training = training.training.unwrap();
    assert_eq!(default.feature_names, training.feature_names);
    assert!(training.feature_names.iter().any(|f| f == "FastingBS_1"));
    assert!(!training.feature_names.iter().any(|f| f == "FastingBS"));
    assert_eq!(default.metrics, training.metrics);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_row_limit_larger_than_input() {
    let (config, dir) = setup("large_limit", 500);
    let registry = PipelineRegistry::from_config(&config);

    let output = registry.run(PipelineName::Processing, None).unwrap();
    assert_eq!(output.processed.unwrap().height(), 10);
    assert_eq!(registry.catalog().intermediate.load().unwrap().height(), 10);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_training_fails_without_processed_data() {
    let (config, dir) = setup("no_processed", 10);
    let registry = PipelineRegistry::from_config(&config);

    let mut run = StaticRunContext::new(Hyperparameters { n_estimators: 5, max_depth: 2 });
    let result = registry.run(PipelineName::Training, Some(&mut run));

    assert!(matches!(result, Err(PipelineError::Data(_))));
    assert!(run.logged().is_empty());
    assert!(!registry.catalog().model_path.exists());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_missing_run_config_aborts_before_training() {
    let dir = temp_dir("no_run_config");
    let config = ProjectConfig::new().with_data_dir(&dir).with_n_rows(10);
    config.catalog().raw.save(&mut ten_records()).unwrap();
    let registry = PipelineRegistry::from_config(&config);

    let mut run = StaticRunContext::default();
    let result = registry.run(PipelineName::Default, Some(&mut run));

    assert!(matches!(result, Err(PipelineError::Configuration(_))));
    // processing output stays in place
    assert!(registry.catalog().processed.exists());
    assert!(!registry.catalog().model_path.exists());

    let _ = std::fs::remove_dir_all(dir);
}
