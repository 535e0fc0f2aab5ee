//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness: the process is up.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: 503 while the catalog is in the failed state.
///
/// A catalog that is still loading counts as ready; it will render the
/// skeleton rather than an error.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.catalog().state().is_failed() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}
