//! Filesystem mirroring with an exclusion filter.
//!
//! Used to copy path-sourced dependencies into the cache and to copy cached
//! working copies into the sandbox without their version-control metadata.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Directory name marking git metadata.
pub const VCS_MARKER: &str = ".git";

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Glob(Pattern),
}

impl Matcher {
    fn matches(&self, component: &str) -> bool {
        match self {
            Matcher::Literal(name) => component == name,
            Matcher::Glob(pattern) => pattern.matches(component),
        }
    }
}

/// Rejects source paths that have a component matching any pattern.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    matchers: Vec<Matcher>,
}

impl ExcludeFilter {
    /// Builds a filter from glob patterns matched against single path
    /// components (`*.pyc`, `.git`, `__pycache__`).
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|p| -> Result<Matcher> {
                let p = p.as_ref();
                if p.contains(['*', '?', '[']) {
                    Ok(Matcher::Glob(Pattern::new(p)?))
                } else {
                    Ok(Matcher::Literal(p.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    /// A filter that only rejects VCS metadata.
    pub fn vcs() -> Self {
        Self {
            matchers: vec![Matcher::Literal(VCS_MARKER.to_string())],
        }
    }

    /// A filter that rejects nothing.
    pub fn none() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Whether `relative` (a path relative to the copy source) is excluded.
    pub fn rejects(&self, relative: &Path) -> bool {
        relative.components().any(|c| {
            let component = c.as_os_str().to_string_lossy();
            self.matchers.iter().any(|m| m.matches(&component))
        })
    }
}

impl Default for ExcludeFilter {
    fn default() -> Self {
        Self::vcs()
    }
}

/// What a copy did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub files_copied: usize,
    pub files_skipped: usize,
    pub dirs_created: usize,
}

/// Recursively mirrors `src` into `dst`.
///
/// With `overwrite`, anything already at `dst` is removed first. Without it,
/// files that already exist at `dst` are left alone. Symlinks are followed;
/// a link cycle is reported as `Error::Filesystem`.
pub fn copy_tree(
    src: &Path,
    dst: &Path,
    exclude: &ExcludeFilter,
    overwrite: bool,
) -> Result<CopyStats> {
    let src_meta = fs::metadata(src).map_err(|e| fs_error("read", src, e))?;
    ensure_disjoint(src, dst)?;

    if overwrite {
        remove_tree(dst)?;
    }

    let mut stats = CopyStats::default();

    if src_meta.is_file() {
        if !overwrite && dst.exists() {
            stats.files_skipped += 1;
        } else {
            copy_file(src, dst)?;
            stats.files_copied += 1;
        }
        return Ok(stats);
    }

    let walker = WalkDir::new(src)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(src)
                .map(|relative| !exclude.rejects(relative))
                .unwrap_or(true)
        });

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let relative = entry.path().strip_prefix(src).map_err(|_| Error::Filesystem {
            message: format!(
                "Path '{}' escaped copy source '{}'",
                entry.path().display(),
                src.display()
            ),
        })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            if !target.is_dir() {
                fs::create_dir_all(&target).map_err(|e| fs_error("create directory", &target, e))?;
                stats.dirs_created += 1;
            }
        } else if !overwrite && target.exists() {
            stats.files_skipped += 1;
        } else {
            copy_file(entry.path(), &target)?;
            stats.files_copied += 1;
        }
    }

    Ok(stats)
}

/// Removes whatever is at `path`. A missing path is not an error.
pub fn remove_tree(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(fs_error("inspect", path, e)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| fs_error("remove", path, e))
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_error("create directory", parent, e))?;
    }
    // Replace rather than write through: the target may be a read-only file
    // or a symlink left by an earlier copy.
    if fs::symlink_metadata(to).is_ok() {
        remove_tree(to)?;
    }
    fs::copy(from, to).map_err(|e| Error::Filesystem {
        message: format!(
            "Failed to copy '{}' to '{}': {}",
            from.display(),
            to.display(),
            e
        ),
    })?;
    Ok(())
}

fn ensure_disjoint(src: &Path, dst: &Path) -> Result<()> {
    let src_abs = src.canonicalize().map_err(|e| fs_error("resolve", src, e))?;
    let dst_abs = absolute_resolved(dst)?;
    if dst_abs.starts_with(&src_abs) {
        return Err(Error::Filesystem {
            message: format!(
                "Destination '{}' lies inside copy source '{}'",
                dst.display(),
                src.display()
            ),
        });
    }
    Ok(())
}

// Canonicalizes the longest existing ancestor of `path` and appends the rest.
fn absolute_resolved(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| fs_error("resolve", path, e))?;
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            return Ok(rest.iter().rev().fold(resolved, |acc, part| acc.join(part)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}

fn fs_error(action: &str, path: &Path, e: io::Error) -> Error {
    Error::Filesystem {
        message: format!("Failed to {} '{}': {}", action, path.display(), e),
    }
}

fn walk_error(src: &Path, e: walkdir::Error) -> Error {
    let at = e
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| src.display().to_string());
    match e.loop_ancestor() {
        Some(ancestor) => Error::Filesystem {
            message: format!(
                "Symlink cycle while copying '{}': '{}' points back to '{}'",
                src.display(),
                at,
                ancestor.display()
            ),
        },
        None => Error::Filesystem {
            message: format!("Failed to read '{}': {}", at, e),
        },
    }
}
