use std::sync::Arc;

use crate::scripting::orchestrator::ScriptOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Validate → wrap → run → parse pipeline for submitted scripts.
    pub orchestrator: Arc<ScriptOrchestrator>,
}
