//! Shared execution types and the sandbox runner interface.
//!
//! Defines [`SandboxRunner`], the trait the service uses to run a harness
//! program in isolation, along with [`RunnerResult`], [`ExecutionOutcome`],
//! and [`RunnerError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::harness::WrappedProgram;

/// Raw outcome of one sandboxed child process.
#[derive(Debug, Clone)]
pub struct RunnerResult {
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Complete stdout captured from the process.
    pub stdout: String,
    /// Complete stderr captured from the process.
    pub stderr: String,
    /// Whether the wall-clock timeout fired and the child was killed.
    pub timed_out: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Terminal, classified result of running one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// `main()` returned a JSON-serializable value.
    Success {
        /// The value returned by `main()`.
        result: Value,
        /// Everything the script printed to stdout.
        stdout: String,
    },
    /// The sandbox killed the script for exceeding its time limit.
    TimedOut,
    /// The script raised, or the child exited non-zero for another reason.
    ScriptError {
        /// Trimmed stderr (usually a Python traceback).
        message: String,
    },
    /// The child exited cleanly but stdout did not match the harness
    /// envelope. Always a server-side defect.
    ProtocolViolation {
        raw_stdout: String,
        raw_stderr: String,
    },
}

impl ExecutionOutcome {
    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::TimedOut => "timed_out",
            Self::ScriptError { .. } => "script_error",
            Self::ProtocolViolation { .. } => "protocol_violation",
        }
    }
}

/// Infrastructure failures while invoking the sandbox runner.
///
/// None of these are the submitter's fault; the service reports them as
/// internal errors.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The runner binary could not be started.
    #[error("Failed to spawn sandbox runner '{runner}': {source}")]
    Spawn {
        runner: String,
        #[source]
        source: std::io::Error,
    },
    /// The scratch file for the harness could not be created or written.
    #[error("Failed to prepare scratch file: {0}")]
    ScratchFile(#[source] std::io::Error),
    /// An I/O error occurred while waiting on the child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs a harness program inside an isolation boundary.
///
/// Implementations own the scratch artifact for the duration of the call
/// and must remove it before returning, on every path.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    /// Execute `program`, killing it once `timeout` has elapsed.
    async fn run(
        &self,
        program: &WrappedProgram,
        timeout: Duration,
    ) -> Result<RunnerResult, RunnerError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
