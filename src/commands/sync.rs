//! # Sync Command Implementation
//!
//! Synchronizes every dependency of the configuration into a cache
//! directory, without laying out a sandbox. Useful for warming the cache or
//! for checking that every reference still resolves.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use role_sync::logging::Logger;
use role_sync::sandbox::SandboxLayout;
use role_sync::sync::{PathOutcome, RepoAction, SyncOutcome};

/// Synchronize dependencies into a cache directory
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the configuration file (defaults to .role-sync.yml)
    #[arg(short, long, value_name = "PATH", env = "ROLE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory receiving one subdirectory per dependency.
    ///
    /// Defaults to the instance's dependency cache under
    /// `<project_root>/.kitchen/yansible/dependencies/<instance>`.
    #[arg(long, value_name = "DIR", env = "ROLE_SYNC_CACHE")]
    pub cache_root: Option<PathBuf>,

    /// Instance whose default cache is used
    #[arg(short, long, value_name = "NAME", env = "ROLE_SYNC_INSTANCE")]
    pub instance: Option<String>,

    /// Print the synchronization report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the sync command
pub fn execute(args: SyncArgs) -> Result<()> {
    let loaded = super::load_config(args.config)?;
    let instance = loaded.instance(args.instance);

    let cache_root = match args.cache_root {
        Some(root) => root,
        None => SandboxLayout::new(&loaded.project_root(None), &instance)?
            .cache_root()
            .to_path_buf(),
    };

    let logger = Logger::new(&instance);
    let synchronizer = super::git_synchronizer(&loaded.config, &logger);
    let report = synchronizer
        .synchronize(&loaded.config.dependencies, &cache_root)
        .with_context(|| format!("Synchronization into '{}' failed", cache_root.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        println!("{}", describe(outcome));
    }
    println!(
        "✅ {} dependencies synchronized into {}",
        report.outcomes.len(),
        cache_root.display()
    );
    Ok(())
}

pub(crate) fn describe(outcome: &SyncOutcome) -> String {
    let mut parts = Vec::new();
    match &outcome.path {
        Some(PathOutcome::Copied { stats }) => {
            parts.push(format!("copied {} files", stats.files_copied))
        }
        Some(PathOutcome::Missing { path }) => {
            parts.push(format!("path {} missing, skipped", path.display()))
        }
        None => {}
    }
    if let Some(repo) = &outcome.repo {
        let action = match &repo.action {
            RepoAction::ClonedFresh => "cloned",
            RepoAction::RecloneInvalid => "recloned (invalid cache)",
            RepoAction::RecloneOriginMismatch { .. } => "recloned (origin changed)",
            RepoAction::Reused { .. } => "updated",
        };
        parts.push(format!("{} at {} ({})", action, repo.r#ref, repo.commit));
    }
    format!("  {}: {}", outcome.name, parts.join(", "))
}
