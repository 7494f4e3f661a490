//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// mangarank - view statistics aggregation and ranking service
#[derive(Parser)]
#[command(name = "mangarank")]
#[command(version)]
#[command(about = "View statistics aggregation and ranking service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and the background aggregation task (default)
    Serve,

    /// Run one full aggregation pass and print the report as JSON
    Aggregate,

    /// Delete view statistics snapshots older than N days
    Cleanup {
        /// Days of snapshots to keep (default: aggregation.snapshot_retention_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,
    },
}
