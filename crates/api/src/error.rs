use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pyexec_core::error::CoreError;
use pyexec_core::scripting::executor::RunnerError;
use serde_json::json;

/// Generic message for failures whose details must stay server-side.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`RunnerError`] and adds the client-facing
/// execution failures. Implements [`IntoResponse`] to produce the JSON
/// error bodies of the `/execute` contract.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `pyexec_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The sandbox runner could not be invoked.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// A malformed request or a script that failed validation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The script was killed for exceeding its time limit.
    #[error("Execution timed out")]
    Timeout,

    /// The script raised or exited non-zero.
    #[error("Script execution failed: {stderr}")]
    ScriptFailed { stderr: String },

    /// The harness exited cleanly but broke its output contract.
    #[error("Invalid JSON output from script")]
    InvalidOutput { raw_stdout: String, stderr: String },
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            // --- CoreError variants ---
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::Core(core) => {
                tracing::error!(error = %core, "Internal core error");
                internal()
            }

            // --- Sandbox infrastructure ---
            AppError::Runner(err) => {
                tracing::error!(error = %err, "Sandbox runner failure");
                internal()
            }

            // --- Execution outcomes ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                json!({ "error": "Execution timed out" }),
            ),
            AppError::ScriptFailed { stderr } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Script execution failed", "stderr": stderr }),
            ),
            AppError::InvalidOutput { raw_stdout, stderr } => {
                tracing::error!(
                    stdout_len = raw_stdout.len(),
                    stderr_len = stderr.len(),
                    "Harness output violated the result protocol"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Invalid JSON output from script",
                        "raw_stdout": raw_stdout,
                        "stderr": stderr,
                    }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": INTERNAL_ERROR_MESSAGE }),
    )
}
