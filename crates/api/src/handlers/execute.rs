//! Handler for `POST /execute`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use pyexec_core::scripting::executor::ExecutionOutcome;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Successful execution: the value `main()` returned and what it printed.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub result: Value,
    pub stdout: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /execute
///
/// Run `{"script": "<python source>"}` in the sandbox and return the value
/// of its `main()`.
pub async fn execute_script(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<ExecuteResponse>> {
    let Json(body) = payload.map_err(rejection_to_error)?;
    let script = extract_script(&body)?;

    match state.orchestrator.run_script(script).await? {
        ExecutionOutcome::Success { result, stdout } => Ok(Json(ExecuteResponse { result, stdout })),
        ExecutionOutcome::TimedOut => Err(AppError::Timeout),
        ExecutionOutcome::ScriptError { message } => {
            Err(AppError::ScriptFailed { stderr: message })
        }
        ExecutionOutcome::ProtocolViolation {
            raw_stdout,
            raw_stderr,
        } => Err(AppError::InvalidOutput {
            raw_stdout,
            stderr: raw_stderr,
        }),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::BadRequest("Request must be JSON".to_string())
        }
        other => AppError::BadRequest(format!("Invalid JSON body: {}", other.body_text())),
    }
}

fn extract_script(body: &Value) -> AppResult<&str> {
    match body.get("script") {
        None => Err(AppError::BadRequest("Missing 'script' field".to_string())),
        Some(Value::String(script)) => Ok(script.as_str()),
        Some(_) => Err(AppError::BadRequest("'script' must be a string".to_string())),
    }
}
