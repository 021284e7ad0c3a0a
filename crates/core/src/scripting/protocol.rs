//! Interpretation of a sandboxed run against the harness wire contract.

use serde::Deserialize;
use serde_json::Value;

use super::executor::{ExecutionOutcome, RunnerResult};

/// Message used when a script fails without writing anything to stderr.
pub const GENERIC_FAILURE: &str = "Execution failed";

/// The single JSON object the harness prints on success.
#[derive(Debug, Deserialize)]
struct HarnessEnvelope {
    result: Value,
    stdout: String,
}

/// Classify a [`RunnerResult`].
///
/// Timeout evidence wins over the exit code: a runner that kills a script
/// for exceeding its time limit may itself exit non-zero, which would
/// otherwise look like a script crash. The marker in stderr is checked
/// alongside the local timeout flag.
pub fn parse(result: &RunnerResult, timeout_marker: &str) -> ExecutionOutcome {
    if result.timed_out || result.stderr.contains(timeout_marker) {
        return ExecutionOutcome::TimedOut;
    }

    if result.exit_code != 0 {
        let stderr = result.stderr.trim();
        let message = if stderr.is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            stderr.to_string()
        };
        return ExecutionOutcome::ScriptError { message };
    }

    match serde_json::from_str::<HarnessEnvelope>(result.stdout.trim()) {
        Ok(envelope) => ExecutionOutcome::Success {
            result: envelope.result,
            stdout: envelope.stdout,
        },
        Err(_) => ExecutionOutcome::ProtocolViolation {
            raw_stdout: result.stdout.clone(),
            raw_stderr: result.stderr.clone(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
