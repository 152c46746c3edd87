//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Role Sync - Synchronize role dependencies into a test sandbox
#[derive(Parser, Debug)]
#[command(name = "role-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        env = "ROLE_SYNC_LOG_LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize dependencies into a cache directory
    Sync(commands::sync::SyncArgs),

    /// Synchronize dependencies and lay out the instance sandbox
    Materialize(commands::materialize::MaterializeArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Sync(args) => commands::sync::execute(args),
            Commands::Materialize(args) => commands::materialize::execute(args),
        }
    }
}

/// `RUST_LOG`, when set, refines the level given on the command line.
fn init_logging(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Info);
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
