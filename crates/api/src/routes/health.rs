use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Service name reported by the health probe.
pub const SERVICE_NAME: &str = "Secure Python Executor";

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `"active"` while the process is serving.
    pub status: &'static str,
    pub service: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET / and GET /health -- liveness probe, never touches the sandbox.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Mount health check routes at the root.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
}
