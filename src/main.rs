//! heartflow - main entry point

use clap::Parser;
use heartflow::cli::{cmd_info, cmd_run, cmd_runs, cmd_sweep, show_help, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heartflow=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            pipeline,
            params,
            n_estimators,
            max_depth,
            n_rows,
            criterion,
            max_features,
        }) => {
            cmd_run(pipeline, &params, n_estimators, max_depth, n_rows, criterion, max_features)?;
        }
        Some(Commands::Sweep { count, params, sweep_config }) => {
            cmd_sweep(count, &params, sweep_config.as_deref())?;
        }
        Some(Commands::Runs { params, delete }) => {
            cmd_runs(&params, delete.as_deref())?;
        }
        Some(Commands::Info { data }) => {
            cmd_info(&data)?;
        }
        None => show_help(),
    }

    Ok(())
}
