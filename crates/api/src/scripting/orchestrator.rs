//! Central script orchestrator service.
//!
//! Coordinates validation, harness generation, sandbox dispatch, and result
//! classification. Held in [`AppState`](crate::state::AppState) as an
//! `Arc<ScriptOrchestrator>`.

use std::sync::Arc;
use std::time::Duration;

use pyexec_core::error::CoreError;
use pyexec_core::scripting::executor::{ExecutionOutcome, SandboxRunner};
use pyexec_core::scripting::harness;
use pyexec_core::scripting::protocol;
use pyexec_core::scripting::sandbox::{NsjailRunner, SandboxConfig};
use pyexec_core::scripting::validator::{self, ValidationOutcome};

use crate::error::AppResult;

/// Runs submitted scripts through the sandbox.
///
/// Manages the full lifecycle:
/// 1. Validate the source (syntax and a top-level `main`).
/// 2. Wrap it in the result harness.
/// 3. Dispatch to the sandbox runner.
/// 4. Classify the runner's output.
pub struct ScriptOrchestrator {
    runner: Arc<dyn SandboxRunner>,
    timeout: Duration,
    timeout_marker: String,
}

impl ScriptOrchestrator {
    /// Create an orchestrator around any runner implementation.
    pub fn new(
        runner: Arc<dyn SandboxRunner>,
        timeout: Duration,
        timeout_marker: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            timeout,
            timeout_marker: timeout_marker.into(),
        }
    }

    /// Create an orchestrator backed by [`NsjailRunner`].
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(
            Arc::new(NsjailRunner::new(config.clone())),
            config.timeout,
            config.timeout_marker.clone(),
        )
    }

    /// Validate and execute `source`.
    ///
    /// A script that fails validation never reaches the runner and is
    /// reported as [`CoreError::Validation`] carrying the validator's reason.
    /// Runner invocation failures surface as [`AppError::Runner`](crate::error::AppError::Runner); every
    /// completed run yields an [`ExecutionOutcome`].
    pub async fn run_script(&self, source: &str) -> AppResult<ExecutionOutcome> {
        // 1. Validate.
        if let ValidationOutcome::Invalid(reason) = validator::validate(source)? {
            tracing::info!(reason = %reason, source_len = source.len(), "Script rejected");
            return Err(CoreError::Validation(reason).into());
        }

        // 2. Wrap.
        let program = harness::wrap(source);

        // 3. Run.
        let result = self.runner.run(&program, self.timeout).await?;

        // 4. Classify.
        let outcome = protocol::parse(&result, &self.timeout_marker);

        tracing::info!(
            outcome = outcome.kind(),
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Script execution finished"
        );

        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
