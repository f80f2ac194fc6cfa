//! Route definition for the upload boundary.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::upload;
use crate::state::AppState;

/// Routes mounted at `/api`.
///
/// ```text
/// POST /upload -> upload_video (multipart, body limit raised to fit the
///                 100MB file cap plus field overhead)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/upload",
        post(upload::upload_video).layer(DefaultBodyLimit::max(upload::MAX_UPLOAD_BYTES + 64 * 1024)),
    )
}
