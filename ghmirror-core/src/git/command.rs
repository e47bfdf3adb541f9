//! External command capability
//!
//! The mirror state machine never spawns processes directly. It describes
//! what to run as an [`Invocation`] and hands it to a [`CommandRunner`], so
//! tests can substitute a fake that records calls and simulates results.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::{Error, Result};

/// A fully described external command
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Program to execute, looked up in PATH when not absolute
    pub program: OsString,
    /// Arguments, not including the program
    pub args: Vec<OsString>,
    /// Working directory; inherits the current one when `None`
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered on top of the inherited environment
    pub env: Vec<(OsString, OsString)>,
    /// Bytes written to stdin before it is closed
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    /// Start describing a command for `program`
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run inside `dir`
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set one environment variable for this invocation only
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Feed `input` on stdin
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// First argument as UTF-8, typically the git subcommand
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().and_then(|a| a.to_str())
    }

    /// Value of an environment override, if set
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Human readable command line, for log messages
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
    /// Whether the command exited successfully
    pub success: bool,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandOutput {
    /// A successful result carrying `output`
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            output: output.into(),
        }
    }

    /// A failed result with exit `code` carrying `output`
    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            output: output.into(),
        }
    }

    /// Short description of how the command ended
    pub fn status_line(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external commands
///
/// `Err` means the command could not be started at all. A command that ran
/// and failed is reported as `Ok` with `success == false`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Runs commands as real subprocesses on the tokio runtime
///
/// Children are killed if the future running them is dropped, so aborting a
/// worker never leaves an orphaned `git` behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = invocation.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Other(format!(
                    "Executable not found: '{}'",
                    invocation.program.to_string_lossy()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        if let (Some(input), Some(mut stdin)) = (&invocation.stdin, child.stdin.take()) {
            stdin.write_all(input).await?;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            output: combined,
        })
    }
}
