//! # Materialize Command Implementation
//!
//! Synchronizes the dependencies into the instance cache and lays out the
//! instance sandbox under `<project_root>/.kitchen/yansible/<instance>`.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use role_sync::logging::Logger;
use role_sync::sandbox::{Materializer, SandboxLayout};

/// Synchronize dependencies and lay out the instance sandbox
#[derive(Args, Debug)]
pub struct MaterializeArgs {
    /// Path to the configuration file (defaults to .role-sync.yml)
    #[arg(short, long, value_name = "PATH", env = "ROLE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project root holding `host_vars`, `roles` and the `.kitchen` directory
    #[arg(long, value_name = "DIR", env = "ROLE_SYNC_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Instance name; selects the sandbox and dependency cache
    #[arg(short, long, value_name = "NAME", env = "ROLE_SYNC_INSTANCE")]
    pub instance: Option<String>,

    /// Print the materialization report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the materialize command
pub fn execute(args: MaterializeArgs) -> Result<()> {
    let loaded = super::load_config(args.config)?;
    let project_root = loaded.project_root(args.project_root);
    let instance = loaded.instance(args.instance);

    if !project_root.is_dir() {
        anyhow::bail!("Project root not found: {}", project_root.display());
    }

    let layout = SandboxLayout::new(&project_root, &instance)?;
    let logger = Logger::new(&instance);
    let materializer = Materializer::new(
        super::git_synchronizer(&loaded.config, &logger),
        logger.scoped("sandbox"),
    );

    let report = materializer
        .materialize(&loaded.config.dependencies, &project_root, &layout)
        .with_context(|| format!("Materializing instance '{}' failed", instance))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for outcome in &report.sync.outcomes {
        println!("{}", super::sync::describe(outcome));
    }
    println!(
        "✅ Sandbox ready at {} ({} roles, {} project directories, {} plugin files)",
        layout.instance_root().display(),
        report.roles.len(),
        report.project_dirs.len(),
        report.plugins.files_copied
    );
    Ok(())
}
