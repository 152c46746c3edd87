//! # Role Sync Library
//!
//! This library synchronizes configuration-management dependencies (role and
//! module bundles) from local paths and git repositories into a per-instance
//! cache, and lays them out into a sandbox tree an automation run executes
//! against. It backs the `role-sync` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use role_sync::config;
//!
//! let config = config::parse(r#"
//! dependencies:
//!   - name: common
//!     path: ../shared/common
//!   - name: role_a
//!     repo: git
//!     url: https://example.com/role_a.git
//!     ref: v1.0
//! "#).unwrap();
//!
//! assert_eq!(config.dependencies.len(), 2);
//! assert_eq!(config.default_ref, "master");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the dependency list and run settings.
//! - **Synchronization (`sync`)**: a per-dependency state machine that drives
//!   each cache entry to its declared source and reference, whatever state the
//!   cache was left in.
//! - **Repository access (`repository`, `git`)**: a trait for the repository
//!   capabilities the synchronizer needs and its `git` binary backend.
//! - **Mirroring (`mirror`)**: recursive copies with an exclusion filter.
//! - **Sandbox (`sandbox`)**: the instance sandbox layout and materialization.
//! - **Processes (`process`)**: running external commands with both output
//!   streams drained concurrently.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: parse and validate the configuration file.
//! 2.  **Synchronize**: bring every `dependencies/<instance>/<name>` cache
//!     entry into agreement with its source, in declaration order.
//! 3.  **Materialize**: mirror project directories, cached dependencies and
//!     their plugins into `.kitchen/yansible/<instance>`, without VCS
//!     metadata.

pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod logging;
pub mod mirror;
pub mod process;
pub mod repository;
pub mod sandbox;
pub mod sync;

#[cfg(test)]
mod mirror_proptest;
