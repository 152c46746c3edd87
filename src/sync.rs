//! # Dependency Synchronization
//!
//! The synchronizer brings the cache directory of every declared dependency
//! into agreement with its source, one dependency at a time and in
//! declaration order.
//!
//! ## Per-dependency steps
//!
//! 1. **Path source**: if the path exists it is mirrored into
//!    `cache_root/<name>` (VCS metadata excluded, existing content replaced).
//!    A missing path is logged and skipped.
//! 2. **Repository source**: the cache directory is inspected and driven to a
//!    pristine working copy:
//!    - absent → clone;
//!    - present but not a repository root → remove, clone;
//!    - a repository with another origin → remove, clone;
//!    - a repository with the same origin → clean, fetch (reuse).
//!
//!    The reference is then resolved and force-checked-out. A reference that
//!    does not resolve stops the whole run with `InvalidReference`.
//!
//! Dependencies synchronized before a failure are left as they are. Running
//! the synchronizer again with the same descriptors converges to the same
//! trees; any manual edit inside the cache is discarded.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{Config, DependencyDescriptor, RepoKind, RepoSource};
use crate::defaults;
use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::mirror::{self, CopyStats, ExcludeFilter};
use crate::repository::{self, CommitId, RepoHandle, RepositoryClient, WorkingCopy};

/// Settings shared by every dependency of a run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Reference used for repository dependencies that name none.
    pub default_ref: String,
    /// Whether clones skip TLS certificate verification.
    pub insecure_tls: bool,
    /// Filter applied when mirroring path sources.
    pub exclude: ExcludeFilter,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_ref: config.default_ref.clone(),
            insecure_tls: config.insecure_tls,
            exclude: ExcludeFilter::vcs(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_ref: defaults::DEFAULT_REF.to_string(),
            insecure_tls: defaults::DEFAULT_INSECURE_TLS,
            exclude: ExcludeFilter::vcs(),
        }
    }
}

/// Result of the path step of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PathOutcome {
    Copied { stats: CopyStats },
    Missing { path: PathBuf },
}

/// How the working copy of a repository dependency was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepoAction {
    /// Nothing was cached; cloned.
    ClonedFresh,
    /// The cache directory was not a repository; removed and cloned.
    RecloneInvalid,
    /// The cached repository had another origin; removed and cloned.
    RecloneOriginMismatch { found: Option<String> },
    /// The cached repository was cleaned and fetched.
    Reused { discarded_changes: bool },
}

/// Result of the repository step of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoOutcome {
    pub action: RepoAction,
    pub r#ref: String,
    pub commit: CommitId,
}

/// What happened to one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub name: String,
    pub destination: PathBuf,
    pub path: Option<PathOutcome>,
    pub repo: Option<RepoOutcome>,
}

impl SyncOutcome {
    /// Whether the destination directory was populated by this run.
    pub fn is_materialized(&self) -> bool {
        self.repo.is_some() || matches!(self.path, Some(PathOutcome::Copied { .. }))
    }
}

/// Outcomes of a run, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn get(&self, name: &str) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// Drives every dependency to its declared state.
pub struct Synchronizer {
    client: Box<dyn RepositoryClient>,
    settings: SyncSettings,
    logger: Logger,
}

impl Synchronizer {
    pub fn new(client: Box<dyn RepositoryClient>, settings: SyncSettings, logger: Logger) -> Self {
        Self {
            client,
            settings,
            logger,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Synchronizes `descriptors` into `cache_root`, stopping at the first
    /// fatal error.
    pub fn synchronize(
        &self,
        descriptors: &[DependencyDescriptor],
        cache_root: &Path,
    ) -> Result<SyncReport> {
        fs::create_dir_all(cache_root).map_err(|e| Error::Filesystem {
            message: format!(
                "Failed to create cache directory '{}': {}",
                cache_root.display(),
                e
            ),
        })?;

        let mut report = SyncReport::default();
        for descriptor in descriptors {
            let outcome = self
                .synchronize_one(descriptor, cache_root)
                .map_err(|e| e.for_dependency(&descriptor.name))?;
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    fn synchronize_one(
        &self,
        descriptor: &DependencyDescriptor,
        cache_root: &Path,
    ) -> Result<SyncOutcome> {
        let logger = self.logger.scoped(&descriptor.name);
        let destination = cache_root.join(&descriptor.name);
        logger.info(format!("Processing '{}' dependency.", descriptor.name));
        if descriptor.path.is_some() && descriptor.repo.is_some() {
            logger.warn(format!(
                "Dependency '{}' has both 'path' and 'repo'; the repository checkout replaces the copied path content.",
                descriptor.name
            ));
        }

        let path = match &descriptor.path {
            Some(source) => Some(self.copy_path(&logger, source, &destination)?),
            None => None,
        };

        let repo = match &descriptor.repo {
            Some(source) => {
                Some(self.sync_repo(&logger, &descriptor.name, source, &destination)?)
            }
            None => None,
        };

        Ok(SyncOutcome {
            name: descriptor.name.clone(),
            destination,
            path,
            repo,
        })
    }

    fn copy_path(&self, logger: &Logger, source: &Path, destination: &Path) -> Result<PathOutcome> {
        if fs::symlink_metadata(source).is_err() {
            logger.warn(format!(
                "Dependency path '{}' doesn't exist. Omitting copy operation.",
                source.display()
            ));
            return Ok(PathOutcome::Missing {
                path: source.to_path_buf(),
            });
        }

        logger.info(format!(
            "Copying '{}' to '{}'.",
            source.display(),
            destination.display()
        ));
        let stats = mirror::copy_tree(source, destination, &self.settings.exclude, true)?;
        logger.debug(format!(
            "Copied {} files into {} new directories.",
            stats.files_copied, stats.dirs_created
        ));
        Ok(PathOutcome::Copied { stats })
    }

    fn sync_repo(
        &self,
        logger: &Logger,
        name: &str,
        source: &RepoSource,
        destination: &Path,
    ) -> Result<RepoOutcome> {
        match RepoKind::from_tag(name, &source.kind)? {
            RepoKind::Git => logger.info("Processing as Git repository."),
        }

        let reference = source.reference(&self.settings.default_ref);
        let (handle, action) = self.prepare_working_copy(logger, source, destination)?;

        let pinned = self.pin(logger, &handle, name, reference);
        self.client.close(handle);

        Ok(RepoOutcome {
            action,
            r#ref: reference.to_string(),
            commit: pinned?,
        })
    }

    /// Leaves a pristine working copy of `source.url` at `destination`.
    fn prepare_working_copy(
        &self,
        logger: &Logger,
        source: &RepoSource,
        destination: &Path,
    ) -> Result<(RepoHandle, RepoAction)> {
        match repository::inspect(&*self.client, destination)? {
            WorkingCopy::Absent => {
                let handle = self.clone_fresh(source, destination)?;
                Ok((handle, RepoAction::ClonedFresh))
            }
            WorkingCopy::InvalidRepo => {
                logger.warn(format!(
                    "Dependency path '{}' is not a valid Git repository. Removing it.",
                    destination.display()
                ));
                mirror::remove_tree(destination)?;
                let handle = self.clone_fresh(source, destination)?;
                Ok((handle, RepoAction::RecloneInvalid))
            }
            WorkingCopy::ValidRepo { handle, origin_url } => {
                if origin_url.as_deref().map(str::trim) == Some(source.url.as_str()) {
                    logger.warn("Dependency downloaded already, resetting to HEAD.");
                    match self.reuse(logger, &handle) {
                        Ok(discarded_changes) => {
                            Ok((handle, RepoAction::Reused { discarded_changes }))
                        }
                        Err(e) => {
                            self.client.close(handle);
                            Err(e)
                        }
                    }
                } else {
                    logger.warn(format!(
                        "Removing directory '{}' due to repository origin difference ({} != {}).",
                        destination.display(),
                        origin_url.as_deref().unwrap_or("<none>"),
                        source.url
                    ));
                    self.client.close(handle);
                    mirror::remove_tree(destination)?;
                    let handle = self.clone_fresh(source, destination)?;
                    Ok((
                        handle,
                        RepoAction::RecloneOriginMismatch { found: origin_url },
                    ))
                }
            }
        }
    }

    fn clone_fresh(&self, source: &RepoSource, destination: &Path) -> Result<RepoHandle> {
        self.client
            .clone_repo(&source.url, destination, self.settings.insecure_tls)
    }

    /// Cleans and fetches a reusable working copy. Returns whether local
    /// changes were discarded.
    fn reuse(&self, logger: &Logger, handle: &RepoHandle) -> Result<bool> {
        let dirty = !self.client.is_clean(handle)?;
        if dirty {
            logger.warn(format!(
                "Discarding local changes in '{}'.",
                handle.path().display()
            ));
        }
        self.client.clean(handle)?;
        self.client.fetch(handle)?;
        Ok(dirty)
    }

    fn pin(
        &self,
        logger: &Logger,
        handle: &RepoHandle,
        name: &str,
        reference: &str,
    ) -> Result<CommitId> {
        let commit = self
            .client
            .resolve_ref(handle, reference)
            .map_err(|e| {
                logger.debug(format!("Resolving '{}' failed: {}", reference, e));
                Error::InvalidReference {
                    name: name.to_string(),
                    r#ref: reference.to_string(),
                }
            })?;

        logger.info(format!(
            "Resetting repository to '{}' reference ({}).",
            reference, commit
        ));
        self.client.checkout(handle, commit.as_str(), true)?;
        Ok(commit)
    }
}
