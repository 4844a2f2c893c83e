// src/exec/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::types::ExecutionStatus;

/// Exit code reported when the deadline fired and the process was killed.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Exit code used when the platform wait status carries no code (e.g. the
/// child was terminated by a signal outside the deadline path).
pub const UNDECODED_EXIT_CODE: i32 = 1;

/// A single command execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Program name or path.
    pub command: String,
    pub args: Vec<String>,
    /// Bound as the child's stdin; must already exist.
    pub input: PathBuf,
    /// Created (truncated) and bound as the child's stdout.
    pub output: PathBuf,
    /// Created (truncated) and bound as the child's stderr.
    pub stderr: PathBuf,
    /// Mirror the child's stderr onto our own stderr as well as the file.
    pub verbose: bool,
    /// Wall-clock limit. `None` or zero means wait for natural exit.
    pub deadline: Option<Duration>,
}

impl RunSpec {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        stderr: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            input: input.into(),
            output: output.into(),
            stderr: stderr.into(),
            verbose: false,
            deadline: None,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// The effective deadline, with zero normalised to "unbounded".
    pub fn effective_deadline(&self) -> Option<Duration> {
        self.deadline.filter(|d| !d.is_zero())
    }

    /// Program plus space-joined arguments, used for audit output.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Outcome of one `execute()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub command: String,
    pub status: ExecutionStatus,
    pub exit_code: i32,
    /// Milliseconds between spawn and reaping.
    pub execution_time: u64,
}

impl ExecutionResult {
    /// Classify a normal process exit.
    pub fn exited(command: String, exit_code: i32, elapsed: Duration) -> Self {
        let status = if exit_code == 0 {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };
        Self {
            command,
            status,
            exit_code,
            execution_time: millis(elapsed),
        }
    }

    /// The deadline fired before the process exited on its own.
    pub fn timed_out(command: String, elapsed: Duration) -> Self {
        Self {
            command,
            status: ExecutionStatus::Timeout,
            exit_code: TIMEOUT_EXIT_CODE,
            execution_time: millis(elapsed),
        }
    }

    /// Placeholder result for `--dry-run`: nothing was spawned.
    pub fn simulated(command: String) -> Self {
        Self::exited(command, 0, Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
