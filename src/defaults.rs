//! Default values for role-sync configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

/// Reference checked out when a repository dependency names none.
pub const DEFAULT_REF: &str = "master";

/// Whether clones tolerate invalid TLS certificates unless configured
/// otherwise. Test infrastructure commonly serves repositories with
/// self-signed certificates.
pub const DEFAULT_INSECURE_TLS: bool = true;

/// Configuration file looked up when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = ".role-sync.yml";

/// Instance name used when neither the configuration nor the CLI names one.
pub const DEFAULT_INSTANCE: &str = "default";

/// Per-project state directory, shared with the test lifecycle tool.
pub const STATE_DIR: &str = ".kitchen";

/// Subdirectory of the state directory owned by this provisioner.
pub const PROVISIONER_DIR: &str = "yansible";

/// Subdirectory of the provisioner directory holding dependency caches.
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Sandbox subdirectory receiving synchronized dependencies.
pub const ROLES_DIR: &str = "roles";

/// Project-local directories mirrored into the sandbox when present.
pub const PROJECT_DIRS: &[&str] = &[
    "host_vars",
    "roles",
    "modules",
    "spec",
    "library",
    "callback_plugins",
    "filter_plugins",
    "lookup_plugins",
    "ssh_private_keys",
];

/// Plugin directories a dependency may carry. Their contents are staged into
/// the sandbox without overwriting files staged earlier.
pub const PLUGIN_DIRS: &[&str] = &[
    "library",
    "modules",
    "callback_plugins",
    "filter_plugins",
    "lookup_plugins",
];
