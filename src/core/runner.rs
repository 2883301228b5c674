//! Subprocess execution module.
//!
//! Hands command text to the platform shell and captures the outcome.
//! The [`CommandRunner`] trait is the seam between the sequential queue
//! and the operating system, so tests can substitute a scripted runner.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as ProcessCommand;

/// Why a command did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The process could not be spawned at all
    Spawn(String),
    /// The process exited with a non-zero status (code, if available)
    Exit(Option<i32>),
    /// The process exceeded the configured time limit
    Timeout(Duration),
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(reason) => write!(f, "command could not be started: {reason}"),
            Self::Exit(Some(code)) => write!(f, "command exited with status {code}"),
            Self::Exit(None) => write!(f, "command was terminated by a signal"),
            Self::Timeout(limit) => {
                write!(f, "command timed out after {}s", limit.as_secs())
            }
        }
    }
}

/// Captured result of running one command.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Set when the command failed; `None` means exit status 0
    pub failure: Option<JobFailure>,
}

impl JobOutcome {
    /// Create a successful outcome with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: String::new(), failure: None }
    }

    /// Create a failed outcome.
    pub fn failed(failure: JobFailure, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: stderr.into(), failure: Some(failure) }
    }

    /// Check if the command succeeded.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Stdout with surrounding whitespace stripped.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get all captured output (stdout then stderr).
    pub fn combined_output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&self.stderr);
        }
        output
    }
}

/// Runs one command text and reports its outcome.
///
/// The queue never interprets exit codes; it only transports the outcome
/// to the job's handler.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a single command to completion and capture its output.
    async fn run(&self, command: &str) -> JobOutcome;
}

/// Shell-backed command runner.
///
/// Command text is handed verbatim to `sh -c` (or `cmd /C` on Windows), so
/// pipes and `&&` behave as they would at a prompt. Interpolated values must
/// be quoted with [`sh_quote`] before they are placed into command text.
#[derive(Debug, Default)]
pub struct ShellRunner {
    /// Working directory for commands (defaults to the current directory)
    working_dir: Option<PathBuf>,

    /// Optional per-command time limit
    timeout: Option<Duration>,
}

impl ShellRunner {
    /// Create a new shell runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for commands.
    #[must_use]
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set a per-command time limit.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> JobOutcome {
        let (shell, shell_arg) = get_shell();

        let mut cmd = ProcessCommand::new(shell);
        cmd.arg(shell_arg);
        cmd.arg(command);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return JobOutcome::failed(JobFailure::Timeout(limit), "", "");
                }
            },
            None => cmd.output().await,
        };

        match output {
            Ok(output) => {
                let failure = if output.status.success() {
                    None
                } else {
                    Some(JobFailure::Exit(output.status.code()))
                };
                JobOutcome {
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    failure,
                }
            }
            Err(e) => JobOutcome::failed(JobFailure::Spawn(e.to_string()), "", ""),
        }
    }
}

/// Get the shell and argument for the current platform.
fn get_shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

/// Quote a value for safe interpolation into shell command text.
///
/// Plain identifiers (branch names, versions) pass through untouched;
/// anything else is single-quoted with embedded quotes escaped.
pub fn sh_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@'));

    if is_plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}
