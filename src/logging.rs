//! Explicit logger handle.
//!
//! Components never log through ambient state of their own. Each receives a
//! [`Logger`] at construction and routes messages through it. The handle
//! forwards to the `log` facade under its own target, so the binary's
//! `env_logger` (or a test logger) decides where messages end up.

use std::fmt::Display;

/// Target used when no instance name is known.
pub const DEFAULT_TARGET: &str = "role_sync";

/// A cheap, clonable logging handle bound to a log target.
#[derive(Debug, Clone)]
pub struct Logger {
    target: String,
}

impl Logger {
    /// Creates a logger that logs under `role_sync::<scope>`.
    pub fn new(scope: &str) -> Self {
        Self {
            target: format!("{}::{}", DEFAULT_TARGET, scope),
        }
    }

    /// Returns a handle for a nested scope, e.g. one dependency.
    pub fn scoped(&self, scope: &str) -> Self {
        Self {
            target: format!("{}::{}", self.target, scope),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn info(&self, message: impl Display) {
        log::info!(target: self.target.as_str(), "{}", message);
    }

    pub fn warn(&self, message: impl Display) {
        log::warn!(target: self.target.as_str(), "{}", message);
    }

    pub fn debug(&self, message: impl Display) {
        log::debug!(target: self.target.as_str(), "{}", message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
        }
    }
}
