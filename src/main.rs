//! # Role Sync CLI
//!
//! This is the binary entry point for the `role-sync` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging from `--log-level` (or `RUST_LOG`).
//! - Executing the selected command and reporting failures with their full
//!   error chain.
//!
//! The synchronization logic lives in the `role_sync` library; the binary is
//! a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
