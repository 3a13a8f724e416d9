//! Integration test: processing stage and processing pipeline

use heartflow::error::PipelineError;
use heartflow::io::CsvDataset;
use heartflow::pipeline::{Catalog, PipelineName, PipelineRegistry, ProcessingPipeline};
use heartflow::processing::{
    drop_null_data, load_and_truncate_data, ProcessingParams, CATEGORICAL_COLUMNS, MARKER_COLUMN,
};
use heartflow::tracking::StaticRunContext;
use heartflow::config::ProjectConfig;
use polars::prelude::*;
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join("heartflow_it_processing")
        .join(format!("{}_{}", name, std::process::id()))
}

/// Eight records, two of them with a missing value
fn raw_records() -> DataFrame {
    df!(
        "id" => &[1i64, 2, 3, 4, 5, 6, 7, 8],
        "Age" => &[Some(40i64), Some(49), Some(37), None, Some(54), Some(39), Some(45), Some(58)],
        "Sex" => &["M", "F", "M", "F", "F", "M", "F", "M"],
        "ChestPainType" => &["ATA", "NAP", "ATA", "ASY", "NAP", "NAP", "ATA", "ASY"],
        "RestingBP" => &[140i64, 160, 130, 138, 150, 120, 130, 136],
        "Cholesterol" => &[Some(289i64), Some(180), Some(283), Some(214), Some(195), None, Some(237), Some(164)],
        "FastingBS" => &[0i64, 0, 0, 0, 0, 0, 0, 1],
        "RestingECG" => &["Normal", "Normal", "ST", "Normal", "Normal", "Normal", "Normal", "ST"],
        "MaxHR" => &[172i64, 156, 98, 108, 122, 170, 170, 99],
        "ExerciseAngina" => &["N", "N", "N", "Y", "N", "N", "N", "Y"],
        "Oldpeak" => &[0.0f64, 1.0, 0.0, 1.5, 0.0, 0.0, 0.0, 2.0],
        "ST_Slope" => &["Up", "Flat", "Up", "Flat", "Up", "Up", "Up", "Flat"],
        "HeartDisease" => &[0i64, 1, 0, 1, 0, 0, 0, 1]
    )
    .unwrap()
}

#[test]
fn test_processing_output_has_no_nulls() {
    let dir = temp_dir("no_nulls");
    let intermediate = CsvDataset::new(dir.join("heart_prepared.csv"));

    let truncated =
        load_and_truncate_data(raw_records(), &ProcessingParams::new(6), &intermediate).unwrap();
    let processed = drop_null_data(truncated).unwrap();

    // rows 4 and 6 carry a null
    assert_eq!(processed.height(), 4);
    assert!(processed.height() <= 6);
    for column in processed.get_columns() {
        assert_eq!(column.null_count(), 0, "column {} has nulls", column.name());
    }

    for name in CATEGORICAL_COLUMNS {
        assert!(matches!(
            processed.column(name).unwrap().dtype(),
            DataType::Categorical(_, _)
        ));
    }

    let names = processed.get_column_names();
    assert_eq!(names.last().map(|n| n.as_str()), Some(MARKER_COLUMN));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_row_limit_above_height_keeps_every_row() {
    let dir = temp_dir("row_limit");
    let intermediate = CsvDataset::new(dir.join("heart_prepared.csv"));

    let truncated =
        load_and_truncate_data(raw_records(), &ProcessingParams::new(1000), &intermediate)
            .unwrap();
    assert_eq!(truncated.height(), 8);
    assert_eq!(intermediate.load().unwrap().height(), 8);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_missing_row_limit_is_a_configuration_error() {
    let dir = temp_dir("missing_limit");
    let intermediate = CsvDataset::new(dir.join("heart_prepared.csv"));

    let err = load_and_truncate_data(raw_records(), &ProcessingParams::default(), &intermediate)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(!intermediate.exists());
}

#[test]
fn test_processing_pipeline_writes_artifacts() {
    let dir = temp_dir("pipeline");
    let catalog = Catalog::from_data_dir(&dir);
    catalog.raw.save(&mut raw_records()).unwrap();

    let processed = ProcessingPipeline::new()
        .run(&catalog, &ProcessingParams::new(5))
        .unwrap();

    // first five rows, one of which has a null Age
    assert_eq!(processed.height(), 4);
    assert_eq!(catalog.intermediate.load().unwrap().height(), 5);

    let reloaded = catalog.processed.load().unwrap();
    assert_eq!(reloaded.height(), 4);
    assert_eq!(reloaded.width(), processed.width());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_registry_runs_processing_without_run_context() {
    let dir = temp_dir("registry");
    let config = ProjectConfig::new().with_data_dir(&dir).with_n_rows(8);
    config.catalog().raw.save(&mut raw_records()).unwrap();

    let registry = PipelineRegistry::from_config(&config);
    let output = registry.run(PipelineName::Processing, None).unwrap();

    assert_eq!(output.processed.unwrap().height(), 6);
    assert!(output.training.is_none());

    // a run context is accepted but unused
    let mut run = StaticRunContext::default();
    let output = registry.run(PipelineName::Processing, Some(&mut run)).unwrap();
    assert!(output.processed.is_some());
    assert!(run.logged().is_empty());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_missing_raw_file() {
    let dir = temp_dir("missing_raw");
    let catalog = Catalog::from_data_dir(&dir);

    let result = ProcessingPipeline::new().run(&catalog, &ProcessingParams::new(5));
    assert!(matches!(result, Err(PipelineError::Data(_))));
}
