//! Job entity model and DTOs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vaani_core::stage::Stage;
use vaani_core::status::{derive_status, JobStatus, StageOutcome};
use vaani_core::types::{JobId, Timestamp};

/// Immutable record of one stage attempt.
///
/// Appended to a job's history by the executor; never mutated or reordered
/// afterwards. Retries of the same stage append additional records with an
/// incremented `attempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub outcome: StageOutcome,
    /// 0-based retry counter for this stage.
    pub attempt: u32,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    /// Artifact produced by this attempt, when one exists.
    pub output_path: Option<PathBuf>,
    /// Short diagnostic for failed or cancelled attempts.
    pub error: Option<String>,
}

impl StageResult {
    /// Wall-clock duration of this attempt in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// One video-translation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Uploaded source file, placed by the upload handler and referenced here.
    pub source_path: PathBuf,
    pub from_lang: String,
    pub to_lang: String,
    pub status: JobStatus,
    /// Stage presently executing, or `None` when no worker holds the job.
    pub current_stage: Option<Stage>,
    /// Append-only record of every stage attempt, in execution order.
    pub stage_history: Vec<StageResult>,
    pub cancel_requested: bool,
    /// Diagnostic message, set only when `status` is `failed`.
    pub error: Option<String>,
    /// Finished artifact, set only when `status` is `completed`.
    pub output_path: Option<PathBuf>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Recompute `status`, `error`, and `output_path` from the history tail
    /// and the cancel flag. Called after every mutation so the stored status
    /// can never drift from the recorded progression.
    pub(crate) fn refresh_derived_fields(&mut self) {
        let last = self
            .stage_history
            .last()
            .map(|r| (r.stage, r.outcome));
        self.status = derive_status(last, self.cancel_requested, self.current_stage.is_some());

        match self.status {
            JobStatus::Completed => {
                self.output_path = self
                    .stage_history
                    .last()
                    .and_then(|r| r.output_path.clone());
                self.error = None;
            }
            JobStatus::Failed => {
                self.output_path = None;
                self.error = self
                    .stage_history
                    .iter()
                    .rev()
                    .find(|r| r.outcome == StageOutcome::FatalFailure)
                    .and_then(|r| r.error.clone());
            }
            _ => {
                self.output_path = None;
            }
        }
    }

    /// The stage reported to polling clients: the in-flight stage if one
    /// exists, otherwise the last recorded one.
    pub fn reported_stage(&self) -> Option<Stage> {
        self.current_stage
            .or_else(|| self.stage_history.last().map(|r| r.stage))
    }
}

/// Input for creating a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub source_path: PathBuf,
    pub from_lang: String,
    pub to_lang: String,
}

/// Query parameters for job listing.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by status (e.g. `failed`).
    pub status: Option<JobStatus>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<usize>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<usize>,
}

/// Condensed job view for list endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub from_lang: String,
    pub to_lang: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            from_lang: job.from_lang.clone(),
            to_lang: job.to_lang.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Aggregate counts across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
}
