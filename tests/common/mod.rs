//! Shared test utilities for integration and E2E tests.
//!
//! Provides a temporary project fixture and [`GitRemote`], a throwaway git
//! repository served over a `file://` URL that stands in for a real remote.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     require_git!();
//!     let fixture = TestFixture::new();
//!     let remote = GitRemote::new(&fixture.path().join("remote"));
//!     remote.commit_file("tasks/main.yml", "---", "initial");
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, head_of, GitRemote, TestFixture};
}

/// Returns early from a test when the `git` binary is not available.
#[macro_export]
macro_rules! require_git {
    () => {
        if !common::git_available() {
            eprintln!("Skipping: git binary not available");
            return;
        }
    };
}

/// Whether a usable `git` binary is on the PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Runs git in `dir` and returns trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Role Sync Tests",
            "-c",
            "user.email=tests@role-sync.invalid",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// The commit checked out in the working copy at `dir`.
pub fn head_of(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

/// A local repository acting as a remote.
pub struct GitRemote {
    dir: PathBuf,
}

impl GitRemote {
    /// Initializes an empty repository on branch `master` at `dir`.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).expect("Failed to create remote directory");
        git(dir, &["init", "--quiet"]);
        git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// The `file://` URL clones should use.
    pub fn url(&self) -> String {
        format!("file://{}", self.dir.display())
    }

    /// Writes `content` to `relative` and commits it. Returns the commit id.
    pub fn commit_file(&self, relative: &str, content: &str, message: &str) -> String {
        let file = self.dir.join(relative);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directory");
        }
        std::fs::write(&file, content).expect("Failed to write file");
        git(&self.dir, &["add", "--all"]);
        git(&self.dir, &["commit", "--quiet", "-m", message]);
        head_of(&self.dir)
    }

    pub fn tag(&self, name: &str) {
        git(&self.dir, &["tag", name]);
    }

    /// Creates `name` at the current commit and switches to it.
    pub fn create_branch(&self, name: &str) {
        git(&self.dir, &["checkout", "--quiet", "-b", name]);
    }

    pub fn switch(&self, name: &str) {
        git(&self.dir, &["checkout", "--quiet", name]);
    }
}

/// A temporary project directory with an optional configuration file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Adds a `.role-sync.yml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".role-sync.yml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Adds a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(".role-sync.yml")
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
