//! # Repository Client
//!
//! This module defines the capability surface the synchronizer needs from a
//! version-controlled repository, independent of how those capabilities are
//! provided.
//!
//! ## Design
//!
//! - **`RepositoryClient`**: clone, open, origin lookup, clean, fetch,
//!   reference resolution, checkout and close. The production implementation
//!   is [`crate::git::GitCli`], which drives the `git` binary. Tests replace
//!   it with a mock to exercise every state transition without touching the
//!   network.
//!
//! - **`RepoHandle`**: an opened working copy. Handles are obtained from
//!   `clone_repo` or `open` and must be handed back through `close` on every
//!   exit path.
//!
//! - **`WorkingCopy`**: the state of a dependency directory, found by
//!   [`inspect`]. Opening is a typed operation (`Error::NotARepository`), so
//!   the absent, invalid and valid states are an explicit enumeration rather
//!   than a caught failure.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// An opened repository working copy.
#[derive(Debug, PartialEq, Eq)]
pub struct RepoHandle {
    path: PathBuf,
}

impl RepoHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Root directory of the working copy.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A fully resolved commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capabilities the synchronizer invokes on a repository.
pub trait RepositoryClient: Send + Sync {
    /// Clones `url` into `destination`, which must not exist yet.
    ///
    /// With `insecure_tls` the remote's certificate is not verified, neither
    /// for the clone nor for later fetches from the same working copy.
    fn clone_repo(&self, url: &str, destination: &Path, insecure_tls: bool) -> Result<RepoHandle>;

    /// Opens `path` as a repository.
    ///
    /// Fails with `Error::NotARepository` unless `path` is the root of a
    /// working copy with a checked-out commit.
    fn open(&self, path: &Path) -> Result<RepoHandle>;

    /// The URL recorded for the `origin` remote.
    fn origin_url(&self, handle: &RepoHandle) -> Result<String>;

    /// Whether the working copy has no modified, untracked or ignored files.
    fn is_clean(&self, handle: &RepoHandle) -> Result<bool>;

    /// Removes untracked and ignored files and resets tracked files to HEAD.
    fn clean(&self, handle: &RepoHandle) -> Result<()>;

    /// Updates remote-tracking branches and tags from `origin`.
    fn fetch(&self, handle: &RepoHandle) -> Result<()>;

    /// Resolves a branch, tag or commit id to a commit.
    fn resolve_ref(&self, handle: &RepoHandle, r#ref: &str) -> Result<CommitId>;

    /// Checks out `r#ref`, discarding working-tree differences when `force`.
    fn checkout(&self, handle: &RepoHandle, r#ref: &str, force: bool) -> Result<()>;

    /// Releases the handle.
    fn close(&self, handle: RepoHandle) {
        drop(handle);
    }
}

/// Observed state of a dependency directory.
#[derive(Debug)]
pub enum WorkingCopy {
    /// Nothing exists at the path.
    Absent,
    /// A usable repository; `origin_url` is `None` when no origin is recorded.
    ValidRepo {
        handle: RepoHandle,
        origin_url: Option<String>,
    },
    /// Something exists at the path but it is not a usable repository root.
    InvalidRepo,
}

/// Determines the working copy state at `path`.
///
/// Only `NotARepository` is folded into `InvalidRepo`; every other failure
/// (a missing git binary, for instance) propagates.
pub fn inspect(client: &dyn RepositoryClient, path: &Path) -> Result<WorkingCopy> {
    if fs_entry_missing(path) {
        return Ok(WorkingCopy::Absent);
    }

    match client.open(path) {
        Ok(handle) => {
            let origin_url = client.origin_url(&handle).ok();
            Ok(WorkingCopy::ValidRepo { handle, origin_url })
        }
        Err(Error::NotARepository { .. }) => Ok(WorkingCopy::InvalidRepo),
        Err(e) => Err(e),
    }
}

// A dangling symlink still occupies the path, so use symlink_metadata.
fn fs_entry_missing(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_err()
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scriptable in-memory repository client used by the synchronizer tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// One recorded call on the mock client.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Clone { url: String, insecure_tls: bool },
        Open(PathBuf),
        Clean(PathBuf),
        Fetch(PathBuf),
        Resolve(String),
        Checkout(String),
        Close(PathBuf),
    }

    #[derive(Debug, Clone)]
    struct MockRepo {
        origin: Option<String>,
        /// ref name -> commit id available after clone or fetch
        refs: HashMap<String, String>,
    }

    /// A repository client whose remotes live in memory.
    ///
    /// Cloning creates the destination directory with a `.mock-repo` marker
    /// holding the origin URL and a `content.txt` naming the remote; a
    /// directory without the marker is "not a repository".
    #[derive(Clone, Default)]
    pub struct MockRepositoryClient {
        remotes: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
        repos: Arc<Mutex<HashMap<PathBuf, MockRepo>>>,
        calls: Arc<Mutex<Vec<Call>>>,
        fail_clone: Arc<Mutex<Option<String>>>,
    }

    impl MockRepositoryClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a remote with the given `(ref, commit)` pairs.
        pub fn with_remote(self, url: &str, refs: &[(&str, &str)]) -> Self {
            self.remotes.lock().unwrap().insert(
                url.to_string(),
                refs.iter()
                    .map(|(r, c)| (r.to_string(), c.to_string()))
                    .collect(),
            );
            self
        }

        pub fn failing_clone(self, message: &str) -> Self {
            *self.fail_clone.lock().unwrap() = Some(message.to_string());
            self
        }

        /// Records an existing working copy at `path` cloned from `origin`.
        pub fn seed_repo(&self, path: &Path, origin: &str) {
            std::fs::create_dir_all(path).unwrap();
            std::fs::write(path.join(".mock-repo"), origin).unwrap();
            let refs = self
                .remotes
                .lock()
                .unwrap()
                .get(origin)
                .cloned()
                .unwrap_or_default();
            self.repos.lock().unwrap().insert(
                path.to_path_buf(),
                MockRepo {
                    origin: Some(origin.to_string()),
                    refs,
                },
            );
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn clone_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Clone { .. }))
                .count()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl RepositoryClient for MockRepositoryClient {
        fn clone_repo(&self, url: &str, destination: &Path, insecure_tls: bool) -> Result<RepoHandle> {
            self.record(Call::Clone {
                url: url.to_string(),
                insecure_tls,
            });
            if let Some(message) = self.fail_clone.lock().unwrap().clone() {
                return Err(Error::Network {
                    url: url.to_string(),
                    message,
                    hint: None,
                });
            }
            if destination.exists() {
                return Err(Error::Filesystem {
                    message: format!("destination {} already exists", destination.display()),
                });
            }
            let refs = self
                .remotes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Network {
                    url: url.to_string(),
                    message: "repository not found".to_string(),
                    hint: None,
                })?;
            std::fs::create_dir_all(destination)?;
            std::fs::write(destination.join(".mock-repo"), url)?;
            std::fs::write(destination.join("content.txt"), url)?;
            self.repos.lock().unwrap().insert(
                destination.to_path_buf(),
                MockRepo {
                    origin: Some(url.to_string()),
                    refs,
                },
            );
            Ok(RepoHandle::new(destination))
        }

        fn open(&self, path: &Path) -> Result<RepoHandle> {
            self.record(Call::Open(path.to_path_buf()));
            let known = self.repos.lock().unwrap().contains_key(path);
            if known && path.join(".mock-repo").is_file() {
                Ok(RepoHandle::new(path))
            } else {
                Err(Error::NotARepository {
                    path: path.to_path_buf(),
                })
            }
        }

        fn origin_url(&self, handle: &RepoHandle) -> Result<String> {
            self.repos
                .lock()
                .unwrap()
                .get(handle.path())
                .and_then(|r| r.origin.clone())
                .ok_or_else(|| Error::GitCommand {
                    command: "remote get-url origin".to_string(),
                    path: handle.path().to_path_buf(),
                    stderr: "No such remote 'origin'".to_string(),
                })
        }

        fn is_clean(&self, handle: &RepoHandle) -> Result<bool> {
            Ok(!handle.path().join("local-edit.txt").exists())
        }

        fn clean(&self, handle: &RepoHandle) -> Result<()> {
            self.record(Call::Clean(handle.path().to_path_buf()));
            let edit = handle.path().join("local-edit.txt");
            if edit.exists() {
                std::fs::remove_file(edit)?;
            }
            Ok(())
        }

        fn fetch(&self, handle: &RepoHandle) -> Result<()> {
            self.record(Call::Fetch(handle.path().to_path_buf()));
            let mut repos = self.repos.lock().unwrap();
            if let Some(repo) = repos.get_mut(handle.path()) {
                if let Some(origin) = &repo.origin {
                    if let Some(refs) = self.remotes.lock().unwrap().get(origin) {
                        repo.refs = refs.clone();
                    }
                }
            }
            Ok(())
        }

        fn resolve_ref(&self, handle: &RepoHandle, r#ref: &str) -> Result<CommitId> {
            self.record(Call::Resolve(r#ref.to_string()));
            let repos = self.repos.lock().unwrap();
            let repo = repos.get(handle.path()).ok_or_else(|| Error::NotARepository {
                path: handle.path().to_path_buf(),
            })?;
            if let Some(commit) = repo.refs.get(r#ref) {
                return Ok(CommitId::new(commit.clone()));
            }
            if repo.refs.values().any(|c| c == r#ref) {
                return Ok(CommitId::new(r#ref));
            }
            Err(Error::GitCommand {
                command: format!("rev-parse {}", r#ref),
                path: handle.path().to_path_buf(),
                stderr: "unknown revision".to_string(),
            })
        }

        fn checkout(&self, handle: &RepoHandle, r#ref: &str, _force: bool) -> Result<()> {
            self.record(Call::Checkout(r#ref.to_string()));
            std::fs::write(handle.path().join("HEAD.txt"), r#ref)?;
            Ok(())
        }

        fn close(&self, handle: RepoHandle) {
            self.record(Call::Close(handle.path().to_path_buf()));
        }
    }
}
