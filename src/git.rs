//! Repository client backed by the system `git` binary.
//!
//! Using the binary means SSH keys, credential helpers and anything else
//! configured in `~/.gitconfig` work exactly as they do for the user.
//! Every command runs with `GIT_CEILING_DIRECTORIES` set to the parent of the
//! working copy, so a dependency cache nested inside another repository (a
//! project checkout, typically) never resolves to that outer repository.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::process::{CommandSpec, Output, ProcessExecutor};
use crate::repository::{CommitId, RepoHandle, RepositoryClient};

const GIT: &str = "git";

/// `RepositoryClient` that shells out to `git`.
///
/// The binary is located on first use, so a client that only ever serves
/// path dependencies works on hosts without git.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    executor: ProcessExecutor,
    logger: Logger,
    version: OnceLock<std::result::Result<String, String>>,
}

impl GitCli {
    /// Creates a client for the `git` on the PATH.
    pub fn new(logger: Logger) -> Self {
        Self::with_program(GIT, logger)
    }

    /// Creates a client for a specific git executable.
    pub fn with_program(program: &str, logger: Logger) -> Self {
        Self {
            program: program.to_string(),
            executor: ProcessExecutor::new(logger.scoped("exec")),
            logger,
            version: OnceLock::new(),
        }
    }

    /// Output of `git --version`, computed once per client.
    ///
    /// Fails with `Error::MissingCapability` when git cannot be run.
    pub fn version(&self) -> Result<&str> {
        let version = self.version.get_or_init(|| {
            match self
                .executor
                .run(&CommandSpec::new(&self.program).arg("--version"))
            {
                Ok(output) => {
                    let version = output.stdout.trim().to_string();
                    self.logger.debug(format!("Using {}", version));
                    Ok(version)
                }
                Err(Error::MissingCapability { message, .. }) => Err(message),
                Err(e) => Err(e.to_string()),
            }
        });
        match version {
            Ok(version) => Ok(version.as_str()),
            Err(message) => Err(Error::MissingCapability {
                tool: self.program.clone(),
                message: format!("couldn't find git binary ({})", message),
                hint: Some(
                    "Please make sure the execution host has Git binaries installed".to_string(),
                ),
            }),
        }
    }

    fn command(&self, dir: &Path) -> CommandSpec {
        let spec = CommandSpec::new(&self.program)
            .cwd(dir)
            .env("GIT_TERMINAL_PROMPT", "0");
        match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                spec.env("GIT_CEILING_DIRECTORIES", parent.to_string_lossy())
            }
            _ => spec,
        }
    }

    /// Runs a git command inside the working copy at `dir`.
    fn run_in(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        let spec = self.command(dir).args(args);
        self.executor.run(&spec).map_err(|e| match e {
            Error::Process { stderr, .. } => Error::GitCommand {
                command: args.join(" "),
                path: dir.to_path_buf(),
                stderr: stderr.trim().to_string(),
            },
            other => other,
        })
    }

    fn rev_parse_commit(&self, dir: &Path, candidate: &str) -> Result<Option<CommitId>> {
        let target = format!("{}^{{commit}}", candidate);
        let spec = self
            .command(dir)
            .args(["rev-parse", "--verify", "--quiet", target.as_str()]);
        match self.executor.run(&spec) {
            Ok(output) => Ok(Some(CommitId::new(output.stdout.trim()))),
            Err(Error::Process { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl RepositoryClient for GitCli {
    fn clone_repo(&self, url: &str, destination: &Path, insecure_tls: bool) -> Result<RepoHandle> {
        self.version()?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                message: format!("Failed to create directory '{}': {}", parent.display(), e),
            })?;
        }

        let mut spec = CommandSpec::new(&self.program).env("GIT_TERMINAL_PROMPT", "0");
        if insecure_tls {
            // -c covers the clone itself, --config persists into the new repo
            // for later fetches.
            spec = spec.args(["-c", "http.sslVerify=false"]);
        }
        spec = spec.args(["clone", "--progress", "--verbose"]);
        if insecure_tls {
            spec = spec.args(["--config", "http.sslVerify=false"]);
        }
        let spec = spec
            .arg("--")
            .arg(url)
            .arg(destination.to_string_lossy());

        self.logger
            .info(format!("Cloning '{}' into {}", url, destination.display()));

        match self.executor.run(&spec) {
            Ok(_) => Ok(RepoHandle::new(destination)),
            Err(Error::Process { stderr, .. }) => {
                if destination.exists() {
                    if let Err(e) = fs::remove_dir_all(destination) {
                        self.logger.debug(format!(
                            "Could not remove partial clone at {}: {}",
                            destination.display(),
                            e
                        ));
                    }
                }
                Err(clone_error(url, &stderr))
            }
            Err(e) => Err(e),
        }
    }

    fn open(&self, path: &Path) -> Result<RepoHandle> {
        self.version()?;
        let not_a_repo = || Error::NotARepository {
            path: path.to_path_buf(),
        };
        if !path.is_dir() {
            return Err(not_a_repo());
        }

        let toplevel = match self.run_in(path, &["rev-parse", "--show-toplevel"]) {
            Ok(output) => output.stdout.trim().to_string(),
            Err(Error::GitCommand { stderr, .. }) => {
                self.logger
                    .debug(format!("{} is not a repository: {}", path.display(), stderr));
                return Err(not_a_repo());
            }
            Err(e) => return Err(e),
        };

        let same_root = match (Path::new(&toplevel).canonicalize(), path.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_root {
            self.logger.debug(format!(
                "{} belongs to the repository at {}",
                path.display(),
                toplevel
            ));
            return Err(not_a_repo());
        }

        // An interrupted clone leaves a .git without any commit checked out.
        if self.rev_parse_commit(path, "HEAD")?.is_none() {
            self.logger
                .debug(format!("{} has no checked-out commit", path.display()));
            return Err(not_a_repo());
        }

        Ok(RepoHandle::new(path))
    }

    fn origin_url(&self, handle: &RepoHandle) -> Result<String> {
        let output = self.run_in(handle.path(), &["remote", "get-url", "origin"])?;
        Ok(output.stdout.trim().to_string())
    }

    fn is_clean(&self, handle: &RepoHandle) -> Result<bool> {
        let output = self.run_in(
            handle.path(),
            &["status", "--porcelain", "--untracked-files=all", "--ignored"],
        )?;
        Ok(output.stdout.trim().is_empty())
    }

    fn clean(&self, handle: &RepoHandle) -> Result<()> {
        self.logger
            .debug(format!("Cleaning up '{}'", handle.path().display()));
        self.run_in(handle.path(), &["clean", "-ffdx"])?;
        self.run_in(handle.path(), &["reset", "--hard", "--quiet"])?;
        Ok(())
    }

    fn fetch(&self, handle: &RepoHandle) -> Result<()> {
        self.logger
            .debug(format!("Fetching origin for '{}'", handle.path().display()));
        match self.run_in(
            handle.path(),
            &["fetch", "--force", "--tags", "--prune", "origin"],
        ) {
            Ok(_) => Ok(()),
            Err(Error::GitCommand { stderr, .. }) => {
                let url = self
                    .origin_url(handle)
                    .unwrap_or_else(|_| "origin".to_string());
                Err(Error::Network {
                    hint: auth_hint(&stderr),
                    url,
                    message: stderr,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_ref(&self, handle: &RepoHandle, r#ref: &str) -> Result<CommitId> {
        let unresolved = || Error::GitCommand {
            command: format!("rev-parse {}", r#ref),
            path: handle.path().to_path_buf(),
            stderr: format!("unknown revision '{}'", r#ref),
        };
        if r#ref.is_empty() || r#ref.starts_with('-') {
            return Err(unresolved());
        }

        // Remote branches first so a fetched branch wins over a stale local one.
        let candidates = [
            format!("refs/remotes/origin/{}", r#ref),
            format!("refs/tags/{}", r#ref),
            r#ref.to_string(),
        ];
        for candidate in &candidates {
            if let Some(commit) = self.rev_parse_commit(handle.path(), candidate)? {
                self.logger
                    .debug(format!("Resolved '{}' via {} to {}", r#ref, candidate, commit));
                return Ok(commit);
            }
        }
        Err(unresolved())
    }

    fn checkout(&self, handle: &RepoHandle, r#ref: &str, force: bool) -> Result<()> {
        self.logger.debug(format!(
            "Checking out {} on {}",
            r#ref,
            handle.path().display()
        ));
        let mut args = vec!["checkout", "--quiet", "--detach"];
        if force {
            args.push("--force");
        }
        args.push(r#ref);
        self.run_in(handle.path(), &args)?;
        Ok(())
    }

    fn close(&self, handle: RepoHandle) {
        self.logger
            .debug(format!("Releasing '{}'", handle.path().display()));
    }
}

fn auth_hint(stderr: &str) -> Option<String> {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("terminal prompts disabled")
    {
        Some(
            "Make sure you have access to the repository. For private repos, \
             ensure an SSH key is loaded in ssh-agent or git credentials are configured"
                .to_string(),
        )
    } else {
        None
    }
}

fn clone_error(url: &str, stderr: &str) -> Error {
    let message = stderr
        .lines()
        .filter(|line| line.starts_with("fatal:") || line.starts_with("error:"))
        .collect::<Vec<_>>()
        .join("\n");
    Error::Network {
        url: url.to_string(),
        message: if message.is_empty() {
            stderr.trim().to_string()
        } else {
            message
        },
        hint: auth_hint(stderr),
    }
}
