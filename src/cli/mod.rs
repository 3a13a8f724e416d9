//! heartflow CLI module
//!
//! Command-line interface for running pipelines, sweeps and inspecting runs.

use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ProjectConfig, DEFAULT_PARAMS_PATH};
use crate::io::CsvDataset;
use crate::pipeline::{PipelineName, PipelineOutput, PipelineRegistry};
use crate::training::{Criterion, MaxFeatures};
use crate::tracking::{
    sweep::format_params, ExperimentTracker, RunStatus, Sweep, SweepConfig, DEFAULT_SWEEP_COUNT,
};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "heartflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart-disease classification pipelines with tracked runs")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a registered pipeline
    Run {
        /// Pipeline to run (processing, training, default)
        #[arg(short, long, default_value = "default")]
        pipeline: PipelineName,

        /// Parameters file
        #[arg(long, default_value = DEFAULT_PARAMS_PATH)]
        params: PathBuf,

        /// Override the number of trees
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Override the maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Override the processing row limit
        #[arg(long)]
        n_rows: Option<usize>,

        /// Override the split criterion (gini, entropy)
        #[arg(long)]
        criterion: Option<Criterion>,

        /// Override the features scanned per split (sqrt, log2, all, a count or a fraction)
        #[arg(long)]
        max_features: Option<MaxFeatures>,
    },

    /// Sweep the forest hyperparameters
    Sweep {
        /// Number of trials
        #[arg(short, long, default_value_t = DEFAULT_SWEEP_COUNT)]
        count: usize,

        /// Parameters file
        #[arg(long, default_value = DEFAULT_PARAMS_PATH)]
        params: PathBuf,

        /// Sweep definition (JSON); the built-in sweep is used when absent
        #[arg(long)]
        sweep_config: Option<PathBuf>,
    },

    /// List tracked runs
    Runs {
        /// Parameters file
        #[arg(long, default_value = DEFAULT_PARAMS_PATH)]
        params: PathBuf,

        /// Delete the run with this id before listing
        #[arg(long, value_name = "RUN_ID")]
        delete: Option<String>,
    },

    /// Show data information
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    pipeline: PipelineName,
    params: &Path,
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    n_rows: Option<usize>,
    criterion: Option<Criterion>,
    max_features: Option<MaxFeatures>,
) -> anyhow::Result<()> {
    let mut config = ProjectConfig::load(params)?;
    if let Some(n) = n_rows {
        config = config.with_n_rows(n);
    }
    if let Some(criterion) = criterion {
        config = config.with_criterion(criterion);
    }
    if let Some(max_features) = max_features {
        config = config.with_max_features(max_features);
    }

    let mut run_config = config.run_config.clone();
    for (key, value) in [("n_estimators", n_estimators), ("max_depth", max_depth)] {
        if let Some(v) = value {
            run_config
                .get_or_insert_with(Default::default)
                .insert(key.to_string(), Value::from(v));
        }
    }

    section(&format!("Pipeline {}", pipeline.as_str().cyan()));
    println!("  {:<12} {}", muted("Nodes"), pipeline.nodes().join(" → "));
    println!("  {:<12} {}", muted("Data dir"), config.data_dir.display());
    if pipeline.needs_run() {
        println!(
            "  {:<12} {} / {}",
            muted("Forest"),
            config.criterion,
            config.max_features
        );
    }
    println!();

    let registry = PipelineRegistry::from_config(&config);
    let start = Instant::now();

    let output = if pipeline.needs_run() {
        let tracker = ExperimentTracker::new(config.project.clone(), config.tracking_dir());
        let mut run = tracker.init(run_config.unwrap_or_default())?;
        let run_id = run.id().to_string();

        match registry.run(pipeline, Some(&mut run)) {
            Ok(output) => {
                run.finish()?;
                step_ok(&format!("run {} finished", accent(&run_id)));
                output
            }
            Err(e) => {
                run.fail(e.to_string())?;
                step_fail(&format!("run {} failed", run_id));
                return Err(e.into());
            }
        }
    } else {
        registry.run(pipeline, None)?
    };

    print_output(&output, registry.catalog().processed.filepath());
    println!("  {:<16} {}", muted("Time"), format!("{:.2?}", start.elapsed()).white());
    println!();
    Ok(())
}

fn print_output(output: &PipelineOutput, processed_path: &Path) {
    if let Some(processed) = &output.processed {
        step_ok(&format!(
            "processed {} rows × {} cols → {}",
            processed.height(),
            processed.width(),
            processed_path.display()
        ));
    }

    let Some(outcome) = &output.training else {
        return;
    };

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Training".white().bold()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("n_estimators ", &outcome.hyperparameters.n_estimators.to_string()));
    line_box(&kv("max_depth    ", &outcome.hyperparameters.max_depth.to_string()));
    line_box(&kv("train / test ", &format!("{} / {}", outcome.n_train, outcome.n_test)));
    line_box(&kv("ROC AUC      ", &format!("{:.4}", outcome.metrics.roc_auc)));
    line_box(&kv("Accuracy     ", &format!("{:.4}", outcome.metrics.accuracy)));
    line_box(&kv("Model        ", &outcome.model_path.display().to_string()));
    line_box_empty();
    line_box_bottom();

    let top = outcome.top_features(5);
    if !top.is_empty() {
        section("Top features");
        for (name, importance) in top {
            println!("  {:<28} {:>8.4}", name, importance);
        }
    }
    println!();
}

pub fn cmd_sweep(count: usize, params: &Path, sweep_config: Option<&Path>) -> anyhow::Result<()> {
    let config = ProjectConfig::load(params)?;
    let sweep_config = match sweep_config {
        Some(path) => serde_json::from_str::<SweepConfig>(&std::fs::read_to_string(path)?)?,
        None => SweepConfig::default(),
    };

    section(&format!("Sweep {}", sweep_config.name.cyan()));
    println!("  {:<12} {:?}", muted("Method"), sweep_config.method);
    println!(
        "  {:<12} {} ({:?})",
        muted("Metric"),
        sweep_config.metric.name,
        sweep_config.metric.goal
    );
    println!("  {:<12} {}", muted("Trials"), count);
    println!();

    let registry = PipelineRegistry::from_config(&config);
    let tracker = ExperimentTracker::new(config.project.clone(), config.tracking_dir());
    let sweep = Sweep::new(sweep_config, &tracker);
    let start = Instant::now();
    let summary = registry.sweep(&sweep, count)?;
    step_ok(&format!(
        "processed {} and ran {} trial(s)",
        registry.catalog().processed.filepath().display(),
        summary.trials.len()
    ));

    println!();
    println!(
        "  {:<4} {:<36} {:>10}",
        muted("#"),
        muted("Parameters"),
        muted(&summary.metric.name)
    );
    println!("  {}", dim(&"─".repeat(52)));
    for (i, trial) in summary.trials.iter().enumerate() {
        let value = match trial.value {
            Some(v) => format!("{:.4}", v).white(),
            None => "failed".red(),
        };
        println!("  {:<4} {:<36} {:>10}", i + 1, format_params(&trial.params), value);
    }
    println!("  {}", dim(&"─".repeat(52)));

    if let Some(best) = summary.best() {
        println!();
        println!(
            "  {} {} {} {:.4}",
            ok("best"),
            format_params(&best.params).white().bold(),
            muted(&format!("{}:", summary.metric.name)),
            best.value.unwrap_or_default()
        );
    }
    if summary.n_failed() > 0 {
        println!("  {}", format!("{} trial(s) failed", summary.n_failed()).yellow());
    }
    println!("  {:<16} {}", muted("Time"), format!("{:.2?}", start.elapsed()).white());
    println!();
    Ok(())
}

pub fn cmd_runs(params: &Path, delete: Option<&str>) -> anyhow::Result<()> {
    let config = ProjectConfig::load(params)?;
    let tracker = ExperimentTracker::new(config.project.clone(), config.tracking_dir());
    if let Some(run_id) = delete {
        tracker.delete_run(run_id)?;
        step_ok(&format!("deleted run {}", accent(run_id)));
    }
    let runs = tracker.runs()?;

    section(&format!("Runs {}", dim(&format!("({})", tracker.project()))));
    if runs.is_empty() {
        println!("  {}", muted("no tracked runs"));
        println!();
        return Ok(());
    }

    println!(
        "  {:<20} {:<10} {:>6} {:>6} {:>9} {:>9}",
        muted("Run"),
        muted("Status"),
        muted("Trees"),
        muted("Depth"),
        muted("ROC AUC"),
        muted("Accuracy")
    );
    println!("  {}", dim(&"─".repeat(66)));

    for run in &runs {
        let status = match run.status {
            RunStatus::Finished => ok("finished"),
            RunStatus::Running => accent("running"),
            RunStatus::Failed => "failed".red(),
        };
        let config_value = |key: &str| {
            run.config
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        let metric = |name: &str| {
            run.metric(name)
                .map(|v| format!("{:.4}", v))
                .unwrap_or_else(|| "-".to_string())
        };
        println!(
            "  {:<20} {:<10} {:>6} {:>6} {:>9} {:>9}",
            run.run_name,
            status,
            config_value("n_estimators"),
            config_value("max_depth"),
            metric("roc_auc"),
            metric("accuracy")
        );
    }
    println!("  {}", dim(&"─".repeat(66)));

    if let Some(best) = tracker.best_run("roc_auc", true)? {
        println!();
        println!(
            "  {} {} {} {:.4}",
            ok("best"),
            best.run_name.white().bold(),
            muted("roc_auc:"),
            best.metric("roc_auc").unwrap_or_default()
        );
    }
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = CsvDataset::new(data_path).load()?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    println!();
    Ok(())
}

// ─── Help ──────────────────────────────────────────────────────────────────────

pub fn show_help() {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "heartflow".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_bottom();

    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("heartflow run", "Processing then training"),
        ("heartflow run -p processing", "Clean and save the raw data"),
        ("heartflow run -p training --max-depth 4", "Train on the processed data"),
        ("heartflow run --criterion entropy --max-features 0.5", "Override the forest options"),
        ("heartflow sweep -c 8", "Bayesian hyperparameter sweep"),
        ("heartflow sweep --sweep-config conf/sweep.json", "Sweep with a custom kernel"),
        ("heartflow runs", "List tracked runs"),
        ("heartflow runs --delete RUN_ID", "Delete a tracked run"),
        ("heartflow info -d data.csv", "Inspect a dataset"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<52} {}", cmd.white(), muted(desc));
    }
    println!();
}
