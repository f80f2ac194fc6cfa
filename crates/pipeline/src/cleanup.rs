//! Artifact cleanup, retention, and startup reconciliation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use vaani_core::layout::ArtifactLayout;
use vaani_core::stage::Stage;
use vaani_core::status::StageOutcome;
use vaani_store::{JobStore, StageResult};

/// How often the retention purge runs.
const RETENTION_INTERVAL: Duration = Duration::from_secs(3600);

/// Diagnostic recorded on jobs found mid-flight after a restart.
const RECOVERY_ERROR: &str = "recovered-after-restart";

/// Remove a job's intermediate artifacts, keeping the finished file.
/// Missing files are fine; a rerun or a never-reached stage leaves gaps.
pub async fn remove_intermediates(layout: &ArtifactLayout, id: vaani_core::types::JobId) {
    for path in layout.intermediate_artifacts(id) {
        remove_file(&path).await;
    }
}

/// Remove every artifact a job could have produced, the finished file and
/// the uploaded source included.
pub async fn remove_all_artifacts(
    layout: &ArtifactLayout,
    id: vaani_core::types::JobId,
    source_path: &std::path::Path,
) {
    for path in layout.job_artifacts(id) {
        remove_file(&path).await;
    }
    remove_file(source_path).await;
}

async fn remove_file(path: &std::path::Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "artifact removed"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove artifact");
        }
    }
}

/// Startup sweep over jobs restored from the snapshot.
///
/// Any job that was queued or mid-flight when the process last stopped
/// cannot be resumed (the admission queue is not persisted and stage state
/// is gone), so it is closed out as failed with a recovery diagnostic and
/// its partial artifacts are dropped.
pub async fn reconcile(store: &JobStore, layout: &ArtifactLayout) {
    let stranded = store.non_terminal().await;
    if stranded.is_empty() {
        return;
    }

    tracing::info!(count = stranded.len(), "reconciling jobs interrupted by restart");
    for job in stranded {
        let now = Utc::now();
        let result = StageResult {
            stage: job.reported_stage().unwrap_or(Stage::IngestValidate),
            outcome: StageOutcome::FatalFailure,
            attempt: 0,
            started_at: now,
            finished_at: now,
            output_path: None,
            error: Some(RECOVERY_ERROR.to_string()),
        };
        if let Err(err) = store.append_stage_result(job.id, result).await {
            tracing::warn!(job_id = %job.id, error = %err, "reconciliation update failed");
            continue;
        }
        remove_intermediates(layout, job.id).await;
    }
}

/// Run the retention purge loop until `cancel` fires.
///
/// Terminal jobs whose last update is older than `retention` are deleted
/// outright, record and artifacts both, bounding disk growth.
pub async fn run_retention_loop(
    store: Arc<JobStore>,
    layout: ArtifactLayout,
    retention: chrono::Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours = retention.num_hours(),
        interval_secs = RETENTION_INTERVAL.as_secs(),
        "retention job started"
    );

    let mut interval = tokio::time::interval(RETENTION_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - retention;
                let expired = store.terminal_older_than(cutoff).await;
                if expired.is_empty() {
                    tracing::debug!("retention: nothing to purge");
                    continue;
                }
                let mut purged = 0usize;
                for job in expired {
                    match store.delete(job.id).await {
                        Ok(removed) => {
                            remove_all_artifacts(&layout, removed.id, &removed.source_path).await;
                            purged += 1;
                        }
                        Err(err) => {
                            tracing::warn!(job_id = %job.id, error = %err, "retention delete failed");
                        }
                    }
                }
                tracing::info!(purged, "retention: purged expired jobs");
            }
        }
    }
}
