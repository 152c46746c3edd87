//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `role-sync` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `role_sync` library.
//!
//! Loading the configuration and wiring the synchronizer to the `git` backend
//! is shared by both commands and lives here.

pub mod materialize;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use role_sync::config::{self, Config};
use role_sync::defaults;
use role_sync::git::GitCli;
use role_sync::logging::Logger;
use role_sync::sync::{SyncSettings, Synchronizer};

/// A configuration file together with where it was read from.
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: Config,
}

impl LoadedConfig {
    /// Project root: the configured one, else the config file's directory.
    pub fn project_root(&self, override_root: Option<PathBuf>) -> PathBuf {
        override_root
            .or_else(|| self.config.project_root.clone())
            .unwrap_or_else(|| config_dir(&self.path).to_path_buf())
    }

    /// Instance name: CLI, then configuration, then the default.
    pub fn instance(&self, override_instance: Option<String>) -> String {
        override_instance
            .or_else(|| self.config.instance.clone())
            .unwrap_or_else(|| defaults::DEFAULT_INSTANCE.to_string())
    }
}

/// Reads the configuration at `path`, or `.role-sync.yml` in the current
/// directory.
pub fn load_config(path: Option<PathBuf>) -> Result<LoadedConfig> {
    let path = path.unwrap_or_else(|| PathBuf::from(defaults::CONFIG_FILE_NAME));
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    let config = config::from_file(&path)
        .with_context(|| format!("Failed to load configuration '{}'", path.display()))?;
    Ok(LoadedConfig { path, config })
}

/// Builds a synchronizer backed by the system `git`.
pub fn git_synchronizer(config: &Config, logger: &Logger) -> Synchronizer {
    Synchronizer::new(
        Box::new(GitCli::new(logger.scoped("git"))),
        SyncSettings::from_config(config),
        logger.scoped("sync"),
    )
}

fn config_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}
