//! Handlers for the `/process` resource.
//!
//! Status polling is the hot path: it reads a point-in-time clone from the
//! store and never touches the worker pool, so a poll can never block a
//! running stage.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use vaani_core::status::JobStatus;
use vaani_core::types::{JobId, Timestamp};
use vaani_engines::health::{check_engines, EngineHealth};
use vaani_store::{Job, JobListQuery, JobStats};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Flat status payload polled by clients.
///
/// `status` is authoritative; `step` carries stage granularity while the
/// job runs and collapses to `"completed"` once the job finishes, so
/// clients may key off either field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub step: String,
    pub from_lang: String,
    pub to_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StatusResponse {
    fn from_job(job: &Job) -> Self {
        let step = match job.status {
            JobStatus::Completed => "completed".to_string(),
            _ => job
                .reported_stage()
                .map(|s| s.name().to_string())
                .unwrap_or_else(|| "queued".to_string()),
        };

        let output_url = (job.status == JobStatus::Completed)
            .then(|| format!("/uploads/processed/{}_final.mp4", job.id));

        Self {
            job_id: job.id,
            status: job.status,
            step,
            from_lang: job.from_lang.clone(),
            to_lang: job.to_lang.clone(),
            error: job.error.clone(),
            output_url,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// GET /api/process/status/{jobId}
///
/// Poll the status of one job. The payload is flat (no `data` envelope);
/// polling clients read `status` and `step` directly.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<StatusResponse>> {
    let job = state.store.get(job_id).await?;
    Ok(Json(StatusResponse::from_job(&job)))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/process/jobs
///
/// List job summaries, newest first. Supports optional `status`, `limit`,
/// and `offset` query parameters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.store.summaries(&params).await;
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Aggregate counts plus worker pool gauges.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub jobs: JobStats,
    pub active_workers: usize,
    pub worker_count: usize,
    pub queue_len: usize,
    pub queue_depth: usize,
}

/// GET /api/process/stats
pub async fn get_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = StatsResponse {
        jobs: state.store.stats().await,
        active_workers: state.scheduler.active_workers(),
        worker_count: state.scheduler.worker_count(),
        queue_len: state.scheduler.queue_len(),
        queue_depth: state.config.queue_depth,
    };
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/process/jobs/{jobId}/cancel
///
/// Request cancellation of a queued or running job. Returns 204 on
/// acceptance, 409 if the job is already terminal, 404 for unknown ids.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    state.controller.cancel(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/process/jobs/{jobId}
///
/// Remove the job record and every artifact belonging to it, the uploaded
/// source and finished file included. Returns 204.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state.store.delete(job_id).await?;
    vaani_pipeline::cleanup::remove_all_artifacts(&state.layout, job_id, &job.source_path).await;

    tracing::info!(job_id = %job_id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Engine health
// ---------------------------------------------------------------------------

/// Engine dependency check payload.
#[derive(Debug, Serialize)]
pub struct EngineHealthResponse {
    /// `ok` when every engine responded, `degraded` otherwise.
    pub status: &'static str,
    pub engines: EngineHealth,
}

/// GET /api/process/health
///
/// Probe the external engines (ffmpeg, whisper). Always returns 200; the
/// body reports which dependencies are reachable.
pub async fn engine_health() -> AppResult<impl IntoResponse> {
    let engines = check_engines().await;
    let status = if engines.all_available() {
        "ok"
    } else {
        "degraded"
    };
    Ok(Json(EngineHealthResponse { status, engines }))
}
