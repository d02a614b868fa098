//! Sleep quality trainer - Main Entry Point
//!
//! With no arguments, trains on `sleep_quality_data.csv` and writes
//! `SleepQualityPredictor.mlmodel`.

use clap::Parser;
use sleep_quality_trainer::cli::{Cli, Commands, TrainArgs, cmd_train, cmd_inspect, cmd_predict, cmd_info};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sleep_quality_trainer=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train(args)) => {
            cmd_train(args)?;
        }
        Some(Commands::Inspect { model }) => {
            cmd_inspect(&model)?;
        }
        Some(Commands::Predict { model, data, output }) => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Some(Commands::Info { data }) => {
            cmd_info(&data)?;
        }
        None => {
            cmd_train(TrainArgs::default())?;
        }
    }

    Ok(())
}
