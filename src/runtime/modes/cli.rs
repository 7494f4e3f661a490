//! CLI mode
//!
//! One-shot maintenance commands that share the server's storage and services.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{Commands, ConfigCommands};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

const DEFAULT_SAMPLE_PATH: &str = "config.example.toml";

/// Run a non-server command
pub async fn run_cli(command: Commands) -> Result<()> {
    match command {
        Commands::Serve => super::run_server().await,
        Commands::Aggregate => {
            let startup = lifetime::startup::prepare_startup().await?;
            let report = startup.aggregation.run_full_aggregation().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.success {
                Ok(())
            } else {
                anyhow::bail!("Aggregation failed: {}", report.message)
            }
        }
        Commands::Cleanup { days } => {
            let startup = lifetime::startup::prepare_startup().await?;
            let days = days.unwrap_or(startup.aggregation.settings().snapshot_retention_days);
            let report = startup.aggregation.cleanup_old_snapshots(days).await;
            println!("{}", report.message);
            if report.success {
                Ok(())
            } else {
                anyhow::bail!("Cleanup failed: {}", report.errors.join("; "))
            }
        }
        Commands::Config { action } => match action {
            ConfigCommands::Generate { output_path } => {
                let path = output_path.unwrap_or_else(|| DEFAULT_SAMPLE_PATH.to_string());
                StaticConfig::write_sample_config(&path)
                    .with_context(|| format!("Failed to write {}", path))?;
                info!("Sample configuration written to {}", path);
                println!("Sample configuration written to {}", path);
                Ok(())
            }
        },
    }
}
