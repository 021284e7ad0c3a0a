//! Route definitions for script execution.

use axum::routing::post;
use axum::Router;

use crate::handlers::execute;
use crate::state::AppState;

/// Execution routes, mounted at the root.
///
/// ```text
/// POST   /execute                   -> execute_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/execute", post(execute::execute_script))
}
