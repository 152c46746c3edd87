//! # Error Handling
//!
//! This module defines the centralized error type for `role-sync`. It uses
//! `thiserror` to build a single `Error` enum covering every failure mode of
//! the synchronization engine, with messages that name the offending
//! dependency and the concrete cause.
//!
//! The variants fall into a few groups:
//!
//! - **Configuration errors** (`ConfigParse`, `UnsupportedRepoKind`): a
//!   mistake in the dependency list. Never retried.
//! - **Environment errors** (`MissingCapability`): a required tool, such as
//!   the `git` binary, is not available on the execution host.
//! - **Reference errors** (`InvalidReference`): a pinned ref does not resolve
//!   inside the synchronized repository.
//! - **I/O errors** (`Network`, `Filesystem`, `Process`, `GitCommand`): the
//!   underlying transport or filesystem failed. Surfaced with full context.
//!
//! `NotARepository` is special: it is the typed failure of opening a
//! directory as a repository and the synchronizer treats it as a state
//! transition rather than a fatal error.
//!
//! `Dependency` wraps any error raised while a named dependency is being
//! processed, so the final message always says which dependency failed.

use std::path::PathBuf;

use thiserror::Error;

fn render_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// Main error type for role-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The dependency configuration could not be parsed or is malformed.
    #[error("Configuration parsing error: {message}{}", render_hint(hint))]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A dependency names a repository kind the engine cannot handle.
    #[error("Unsupported repository kind '{kind}' for dependency '{name}': only 'git' is supported")]
    UnsupportedRepoKind { name: String, kind: String },

    /// A required external tool is not available on the execution host.
    #[error("Required tool '{tool}' is not available: {message}{}", render_hint(hint))]
    MissingCapability {
        tool: String,
        message: String,
        /// Remediation hint shown to the user
        hint: Option<String>,
    },

    /// A pinned reference does not resolve to a commit.
    #[error("Invalid reference '{r#ref}' for dependency '{name}'\n  hint: check the 'ref' of dependency '{name}' in the configuration")]
    InvalidReference { name: String, r#ref: String },

    /// A directory exists but is not the root of a usable repository.
    #[error("Not a repository root: {}", path.display())]
    NotARepository { path: PathBuf },

    /// An external process exited unsuccessfully.
    #[error("Command '{command}' failed with {}: {stderr}", code.map(|c| format!("exit code {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    Process {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A git command failed against an existing working copy.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A filesystem copy or removal failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// Cloning or fetching from a remote failed.
    #[error("Network operation error: {url} - {message}{}", render_hint(hint))]
    Network {
        url: String,
        message: String,
        /// Optional hint for how to resolve the transport issue
        hint: Option<String>,
    },

    /// Any failure raised while synchronizing a named dependency.
    #[error("Dependency '{name}' failed")]
    Dependency {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Attributes this error to the dependency `name`.
    ///
    /// Errors that already identify their dependency are returned unchanged.
    pub fn for_dependency(self, name: &str) -> Self {
        match self {
            Error::InvalidReference { .. }
            | Error::UnsupportedRepoKind { .. }
            | Error::Dependency { .. } => self,
            other => Error::Dependency {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
