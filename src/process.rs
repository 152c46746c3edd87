//! # Process Execution
//!
//! Runs external commands with an explicit environment and working
//! directory, capturing stdout and stderr completely.
//!
//! Both output pipes are drained on their own reader threads while the child
//! runs. A child that writes a lot to both streams at once would otherwise
//! block on a full pipe buffer while we wait on the other stream.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{Error, Result};
use crate::logging::Logger;

/// A command line together with the environment it runs in.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.env.insert(key.to_string(), value.as_ref().to_string());
        self
    }

    pub fn cwd(mut self, cwd: &Path) -> Self {
        self.cwd = Some(cwd.to_path_buf());
        self
    }

    /// The command line as shown in logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

/// Runs commands, logging each invocation through its logger handle.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    logger: Logger,
}

impl ProcessExecutor {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Runs `spec` to completion.
    ///
    /// Returns `Error::Process` with the full stderr when the command exits
    /// unsuccessfully, and `Error::MissingCapability` when the program cannot
    /// be found.
    pub fn run(&self, spec: &CommandSpec) -> Result<Output> {
        let command_line = spec.display();
        self.logger.debug(format!(
            "Environment: [{}] Command line: {}{}",
            spec.env
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", "),
            command_line,
            spec.cwd
                .as_ref()
                .map(|c| format!(" (in {})", c.display()))
                .unwrap_or_default()
        ));

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| spawn_error(spec, e))?;

        let stdout_reader = child
            .stdout
            .take()
            .map(|mut stdout| thread::spawn(move || drain(&mut stdout)));
        let stderr_reader = child
            .stderr
            .take()
            .map(|mut stderr| thread::spawn(move || drain(&mut stderr)));

        let status = child.wait()?;
        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        if !status.success() {
            self.logger.debug(format!(
                "Command returned '{}'. stderr: '{}'",
                status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr.trim_end()
            ));
            return Err(Error::Process {
                command: command_line,
                code: status.code(),
                stderr,
            });
        }

        Ok(Output {
            stdout,
            stderr,
            code: status.code(),
        })
    }
}

fn spawn_error(spec: &CommandSpec, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::MissingCapability {
            tool: spec.program.clone(),
            message: e.to_string(),
            hint: Some(format!(
                "Make sure '{}' is installed and on the PATH of the execution host",
                spec.program
            )),
        }
    } else {
        Error::Process {
            command: spec.display(),
            code: None,
            stderr: format!("failed to start: {}", e),
        }
    }
}

fn drain<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn join_reader(handle: Option<thread::JoinHandle<io::Result<String>>>) -> Result<String> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| Error::Io(io::Error::other("output reader thread panicked")))?
            .map_err(Error::from),
        None => Ok(String::new()),
    }
}
