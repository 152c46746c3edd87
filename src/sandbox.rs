//! # Sandbox Materialization
//!
//! Lays out the tree an automation run executes against:
//!
//! ```text
//! <project_root>/.kitchen/yansible/            host root
//!   dependencies/<instance>/<name>/            synchronized cache (owned by sync)
//!   <instance>/                                instance sandbox
//!     host_vars/ library/ modules/ ...         project directories
//!     roles/<name>/                            synchronized dependencies
//! ```
//!
//! The sandbox never contains version-control metadata. Paths are computed
//! once by [`SandboxLayout::new`]; nothing is cached between calls. Every
//! materialization rebuilds the project, role and plugin directories of the
//! instance sandbox from scratch, so a rerun reflects only the current
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, DependencyDescriptor};
use crate::defaults;
use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::mirror::{self, CopyStats, ExcludeFilter};
use crate::sync::{SyncReport, Synchronizer};

/// Directory layout of one instance's sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
    instance: String,
    host_root: PathBuf,
    instance_root: PathBuf,
    cache_root: PathBuf,
    roles_dir: PathBuf,
}

impl SandboxLayout {
    pub fn new(project_root: &Path, instance: &str) -> Result<Self> {
        if !config::is_plain_name(instance) {
            return Err(Error::ConfigParse {
                message: format!("invalid instance name '{}'", instance),
                hint: Some("Use a plain directory name without '/', '\\' or '..'".to_string()),
            });
        }

        let host_root = project_root
            .join(defaults::STATE_DIR)
            .join(defaults::PROVISIONER_DIR);
        let instance_root = host_root.join(instance);
        let cache_root = host_root.join(defaults::DEPENDENCIES_DIR).join(instance);
        let roles_dir = instance_root.join(defaults::ROLES_DIR);

        Ok(Self {
            instance: instance.to_string(),
            host_root,
            instance_root,
            cache_root,
            roles_dir,
        })
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    pub fn instance_root(&self) -> &Path {
        &self.instance_root
    }

    /// Where the synchronizer keeps this instance's working copies.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn roles_dir(&self) -> &Path {
        &self.roles_dir
    }
}

/// What a materialization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub sync: SyncReport,
    /// Project directories mirrored into the sandbox.
    pub project_dirs: Vec<String>,
    /// Dependencies mirrored into `roles/`.
    pub roles: Vec<String>,
    /// Totals for plugin staging.
    pub plugins: CopyStats,
}

/// Synchronizes dependencies and lays out the instance sandbox.
pub struct Materializer {
    synchronizer: Synchronizer,
    logger: Logger,
}

impl Materializer {
    pub fn new(synchronizer: Synchronizer, logger: Logger) -> Self {
        Self {
            synchronizer,
            logger,
        }
    }

    pub fn materialize(
        &self,
        descriptors: &[DependencyDescriptor],
        project_root: &Path,
        layout: &SandboxLayout,
    ) -> Result<MaterializeReport> {
        let sync = self
            .synchronizer
            .synchronize(descriptors, layout.cache_root())?;

        fs::create_dir_all(layout.instance_root()).map_err(|e| Error::Filesystem {
            message: format!(
                "Failed to create sandbox '{}': {}",
                layout.instance_root().display(),
                e
            ),
        })?;

        // Everything below is rebuilt from this run's inputs only.
        for dir in defaults::PROJECT_DIRS {
            mirror::remove_tree(&layout.instance_root().join(dir))?;
        }

        let vcs = ExcludeFilter::vcs();
        let mut report = MaterializeReport::default();

        for dir in defaults::PROJECT_DIRS {
            let source = project_root.join(dir);
            if !source.is_dir() {
                continue;
            }
            let target = layout.instance_root().join(dir);
            self.logger.info(format!(
                "Copy from '{}' to '{}'",
                source.display(),
                target.display()
            ));
            mirror::copy_tree(&source, &target, &vcs, true)?;
            report.project_dirs.push(dir.to_string());
        }

        let staged: Vec<_> = sync
            .outcomes
            .iter()
            .filter(|outcome| outcome.is_materialized())
            .collect();

        for outcome in &staged {
            let target = layout.roles_dir().join(&outcome.name);
            self.logger.info(format!(
                "Copy from '{}' to '{}'",
                outcome.destination.display(),
                target.display()
            ));
            mirror::copy_tree(&outcome.destination, &target, &vcs, true)?;
            report.roles.push(outcome.name.clone());
        }

        // First stager of a plugin file wins.
        for outcome in &staged {
            for plugin in defaults::PLUGIN_DIRS {
                let source = outcome.destination.join(plugin);
                if !source.is_dir() {
                    continue;
                }
                let stats = mirror::copy_tree(
                    &source,
                    &layout.instance_root().join(plugin),
                    &vcs,
                    false,
                )?;
                self.logger.debug(format!(
                    "Staged {} '{}' from '{}' ({} skipped)",
                    stats.files_copied, plugin, outcome.name, stats.files_skipped
                ));
                report.plugins.files_copied += stats.files_copied;
                report.plugins.files_skipped += stats.files_skipped;
                report.plugins.dirs_created += stats.dirs_created;
            }
        }

        report.sync = sync;
        Ok(report)
    }
}
