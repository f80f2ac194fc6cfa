//! Route definitions for the `/process` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::process;
use crate::state::AppState;

/// Routes mounted at `/api/process`.
///
/// ```text
/// GET    /status/{jobId}       -> get_status
/// GET    /jobs                 -> list_jobs
/// GET    /stats                -> get_stats
/// POST   /jobs/{jobId}/cancel  -> cancel_job
/// DELETE /jobs/{jobId}         -> delete_job
/// GET    /health               -> engine_health
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status/{jobId}", get(process::get_status))
        .route("/jobs", get(process::list_jobs))
        .route("/stats", get(process::get_stats))
        .route("/jobs/{jobId}/cancel", post(process::cancel_job))
        .route("/jobs/{jobId}", delete(process::delete_job))
        .route("/health", get(process::engine_health))
}
