//! # Configuration Schema and Parsing
//!
//! This module defines the dependency configuration consumed by the
//! synchronizer and the logic for parsing and validating it.
//!
//! ## Format
//!
//! The file is YAML. The full form carries run settings next to the
//! dependency list:
//!
//! ```yaml
//! instance: default-ubuntu
//! default_ref: master
//! insecure_tls: true
//! dependencies:
//!   - name: common
//!     path: ../shared/common
//!   - name: role_a
//!     repo: git
//!     url: https://example.com/role_a.git
//!     ref: v1.0
//! ```
//!
//! A bare list of dependencies is accepted as well and uses the defaults for
//! everything else.
//!
//! ## Validation
//!
//! Every descriptor is checked when the configuration is loaded, so a
//! malformed entry stops the run before anything touches the cache:
//!
//! - `name` must be a single, plain directory name and unique in the file.
//! - At least one of `path` or `repo` must be given.
//! - `url` goes together with `repo`; `ref` requires `repo`.
//!
//! The repository kind is deliberately *not* checked here. An unknown kind
//! fails with `UnsupportedRepoKind` when the synchronizer reaches it, after
//! the dependencies declared before it have been synchronized.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Repository kinds the synchronizer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Git,
}

impl RepoKind {
    /// Maps a `repo:` tag to a supported kind (case-insensitive).
    pub fn from_tag(dependency: &str, tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "git" => Ok(RepoKind::Git),
            _ => Err(Error::UnsupportedRepoKind {
                name: dependency.to_string(),
                kind: tag.to_string(),
            }),
        }
    }
}

/// Where a repository dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSource {
    /// The `repo:` tag as written, e.g. `git`.
    pub kind: String,
    /// Remote URL, compared verbatim with the origin of a cached working copy.
    pub url: String,
    /// Branch, tag or commit id. `None` means the configured default branch.
    pub r#ref: Option<String>,
}

impl RepoSource {
    /// The reference to pin, falling back to `default`.
    pub fn reference<'a>(&'a self, default: &'a str) -> &'a str {
        self.r#ref.as_deref().unwrap_or(default)
    }
}

/// One dependency to synchronize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDescriptor {
    /// Unique key, also the destination directory name.
    pub name: String,
    /// Local directory copied into the destination.
    pub path: Option<PathBuf>,
    /// Repository synchronized into the destination after any path copy.
    pub repo: Option<RepoSource>,
}

impl DependencyDescriptor {
    /// A dependency copied from a local path.
    pub fn from_path(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: Some(path.into()),
            repo: None,
        }
    }

    /// A dependency cloned from a git repository.
    pub fn from_git(name: &str, url: &str, r#ref: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            repo: Some(RepoSource {
                kind: "git".to_string(),
                url: url.to_string(),
                r#ref: r#ref.map(str::to_string),
            }),
        }
    }
}

/// A parsed and validated configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub instance: Option<String>,
    pub project_root: Option<PathBuf>,
    pub default_ref: String,
    pub insecure_tls: bool,
    pub dependencies: Vec<DependencyDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: None,
            project_root: None,
            default_ref: defaults::DEFAULT_REF.to_string(),
            insecure_tls: defaults::DEFAULT_INSECURE_TLS,
            dependencies: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
    name: String,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    repo: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    r#ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    instance: Option<String>,
    #[serde(default)]
    project_root: Option<PathBuf>,
    #[serde(default)]
    default_ref: Option<String>,
    #[serde(default)]
    insecure_tls: Option<bool>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
}

/// Parses a configuration from a YAML string.
pub fn parse(yaml: &str) -> Result<Config> {
    let value: serde_yaml::Value = if yaml.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(yaml)?
    };
    let raw = match value {
        serde_yaml::Value::Null => RawConfig {
            instance: None,
            project_root: None,
            default_ref: None,
            insecure_tls: None,
            dependencies: Vec::new(),
        },
        serde_yaml::Value::Sequence(_) => RawConfig {
            instance: None,
            project_root: None,
            default_ref: None,
            insecure_tls: None,
            dependencies: serde_yaml::from_value(value)?,
        },
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value)?,
        _ => {
            return Err(Error::ConfigParse {
                message: "expected a mapping or a list of dependencies".to_string(),
                hint: Some("Start the file with 'dependencies:'".to_string()),
            })
        }
    };

    let default_ref = match raw.default_ref {
        Some(r) if r.trim().is_empty() => {
            return Err(Error::ConfigParse {
                message: "'default_ref' must not be empty".to_string(),
                hint: None,
            })
        }
        Some(r) => r,
        None => defaults::DEFAULT_REF.to_string(),
    };

    let mut seen = HashSet::new();
    let mut dependencies = Vec::with_capacity(raw.dependencies.len());
    for (index, dependency) in raw.dependencies.into_iter().enumerate() {
        let descriptor = validate_dependency(index, dependency)?;
        if !seen.insert(descriptor.name.clone()) {
            return Err(Error::ConfigParse {
                message: format!("duplicate dependency name '{}'", descriptor.name),
                hint: Some("Each dependency needs its own destination name".to_string()),
            });
        }
        dependencies.push(descriptor);
    }

    Ok(Config {
        instance: raw.instance,
        project_root: raw.project_root,
        default_ref,
        insecure_tls: raw.insecure_tls.unwrap_or(defaults::DEFAULT_INSECURE_TLS),
        dependencies,
    })
}

/// Reads and parses a configuration file.
///
/// Relative `path` sources and a relative `project_root` are resolved against
/// the directory containing the file.
pub fn from_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read '{}': {}", path.display(), e),
        hint: None,
    })?;
    let mut config = parse(&content)?;

    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if let Some(root) = &config.project_root {
        config.project_root = Some(base.join(root));
    }
    for dependency in &mut config.dependencies {
        if let Some(source) = &dependency.path {
            dependency.path = Some(base.join(source));
        }
    }
    Ok(config)
}

fn validate_dependency(index: usize, raw: RawDependency) -> Result<DependencyDescriptor> {
    let name = raw.name.trim().to_string();
    let label = if name.is_empty() {
        format!("dependency #{}", index + 1)
    } else {
        format!("dependency '{}'", name)
    };
    let malformed = |message: String, hint: Option<&str>| Error::ConfigParse {
        message: format!("{}: {}", label, message),
        hint: hint.map(str::to_string),
    };

    if !is_plain_name(&name) {
        return Err(malformed(
            format!("invalid name '{}'", raw.name),
            Some("Use a plain directory name without '/', '\\' or '..'"),
        ));
    }

    let repo = match (raw.repo, raw.url) {
        (Some(kind), Some(url)) => {
            let url = url.trim().to_string();
            if url.is_empty() {
                return Err(malformed("'url' must not be empty".to_string(), None));
            }
            if matches!(raw.r#ref.as_deref(), Some(r) if r.trim().is_empty()) {
                return Err(malformed(
                    "'ref' must not be empty".to_string(),
                    Some("Remove 'ref' to use the default branch"),
                ));
            }
            Some(RepoSource {
                kind,
                url,
                r#ref: raw.r#ref.map(|r| r.trim().to_string()),
            })
        }
        (Some(_), None) => {
            return Err(malformed(
                "'repo' requires a 'url'".to_string(),
                Some("Add 'url:' with the repository address"),
            ))
        }
        (None, Some(_)) => {
            return Err(malformed(
                "'url' given without 'repo'".to_string(),
                Some("Add 'repo: git'"),
            ))
        }
        (None, None) => {
            if raw.r#ref.is_some() {
                return Err(malformed(
                    "'ref' given without 'repo'".to_string(),
                    Some("Add 'repo: git' and 'url:'"),
                ));
            }
            None
        }
    };

    if raw.path.is_none() && repo.is_none() {
        return Err(malformed(
            "no source given".to_string(),
            Some("Add 'path:' or 'repo: git' with 'url:'"),
        ));
    }

    Ok(DependencyDescriptor {
        name,
        path: raw.path,
        repo,
    })
}

pub(crate) fn is_plain_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
