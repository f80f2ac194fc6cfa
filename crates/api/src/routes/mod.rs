pub mod health;
pub mod process;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /upload                              upload a video, create + enqueue a job
///
/// /process/status/{jobId}              poll job status (flat payload)
/// /process/jobs                        list job summaries
/// /process/stats                       aggregate job and worker counts
/// /process/jobs/{jobId}/cancel         request cancellation (POST)
/// /process/jobs/{jobId}                delete job and artifacts (DELETE)
/// /process/health                      engine dependency checks
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/process", process::router())
        .merge(upload::router())
}
