//! In-memory job registry.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vaani_core::error::PipelineError;
use vaani_core::stage::Stage;
use vaani_core::status::JobStatus;
use vaani_core::types::JobId;

use crate::job::{Job, JobListQuery, JobStats, JobSummary, NewJob, StageResult};
use crate::snapshot;

/// Default page size for job listing.
const DEFAULT_LIMIT: usize = 50;

/// Maximum page size for job listing.
const MAX_LIMIT: usize = 100;

#[derive(Default)]
struct StoreInner {
    jobs: HashMap<JobId, Job>,
    /// Job ids in creation order; drives listing and snapshots.
    order: Vec<JobId>,
}

impl StoreInner {
    fn ordered_jobs(&self) -> Vec<Job> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .cloned()
            .collect()
    }
}

/// Single source of truth for job state.
///
/// All mutations take the write lock, refresh the job's derived fields, and
/// bump `updated_at` before releasing it, so readers never observe a record
/// whose status disagrees with its history.
pub struct JobStore {
    inner: RwLock<StoreInner>,
    snapshot_path: Option<PathBuf>,
}

impl JobStore {
    /// Create an empty store with no persistence.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            snapshot_path: None,
        }
    }

    /// Create a store backed by a snapshot file, loading any jobs it holds.
    ///
    /// A corrupt snapshot is logged and discarded rather than refusing to
    /// start; the jobs it held are unrecoverable at that point.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut jobs = match snapshot::load(&path) {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unreadable job snapshot");
                Vec::new()
            }
        };
        jobs.sort_by_key(|job| job.created_at);

        let mut inner = StoreInner::default();
        for job in jobs {
            inner.order.push(job.id);
            inner.jobs.insert(job.id, job);
        }
        if !inner.order.is_empty() {
            info!(count = inner.order.len(), "restored jobs from snapshot");
        }

        Self {
            inner: RwLock::new(inner),
            snapshot_path: Some(path),
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch one job by id.
    pub async fn get(&self, id: JobId) -> Result<Job, PipelineError> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .get(&id)
            .cloned()
            .ok_or(PipelineError::NotFound { entity: "Job", id })
    }

    /// List jobs newest first, filtered and paginated.
    pub async fn list(&self, query: &JobListQuery) -> Vec<Job> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| query.status.is_none_or(|s| job.status == s))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Condensed listing for the jobs endpoint.
    pub async fn summaries(&self, query: &JobListQuery) -> Vec<JobSummary> {
        self.list(query).await.iter().map(JobSummary::from).collect()
    }

    /// Every job that has not reached a terminal status. Used at startup to
    /// reconcile records that were in flight when the process last stopped.
    pub async fn non_terminal(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| !job.status.is_terminal())
            .cloned()
            .collect()
    }

    /// Terminal jobs whose last update is older than `cutoff`. Fed to the
    /// retention purge.
    pub async fn terminal_older_than(&self, cutoff: vaani_core::types::Timestamp) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| job.status.is_terminal() && job.updated_at < cutoff)
            .cloned()
            .collect()
    }

    /// Aggregate counts by status.
    pub async fn stats(&self) -> JobStats {
        let inner = self.inner.read().await;
        let mut stats = JobStats::default();
        for job in inner.jobs.values() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
            stats.total += 1;
        }
        stats
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Register a new job in the `queued` state.
    pub async fn create(&self, input: NewJob) -> Result<Job, PipelineError> {
        if input.from_lang.is_empty() || input.to_lang.is_empty() {
            return Err(PipelineError::Validation(
                "Source and target language are required".to_string(),
            ));
        }

        let now = chrono::Utc::now();
        let job = Job {
            id: JobId::new(),
            source_path: input.source_path,
            from_lang: input.from_lang,
            to_lang: input.to_lang,
            status: JobStatus::Queued,
            current_stage: None,
            stage_history: Vec::new(),
            cancel_requested: false,
            error: None,
            output_path: None,
            created_at: now,
            updated_at: now,
        };

        let snapshot_jobs = {
            let mut inner = self.inner.write().await;
            inner.order.push(job.id);
            inner.jobs.insert(job.id, job.clone());
            inner.ordered_jobs()
        };
        info!(job_id = %job.id, from = %job.from_lang, to = %job.to_lang, "job created");
        self.persist(snapshot_jobs);
        Ok(job)
    }

    /// Append one stage attempt to a job's history.
    ///
    /// Terminal jobs reject further records; the history of a finished job
    /// never changes.
    pub async fn append_stage_result(
        &self,
        id: JobId,
        result: StageResult,
    ) -> Result<Job, PipelineError> {
        let (job, snapshot_jobs) = {
            let mut inner = self.inner.write().await;
            let job = inner
                .jobs
                .get_mut(&id)
                .ok_or(PipelineError::NotFound { entity: "Job", id })?;
            if job.status.is_terminal() {
                return Err(PipelineError::AlreadyTerminal(id));
            }
            job.stage_history.push(result);
            job.current_stage = None;
            job.updated_at = chrono::Utc::now();
            job.refresh_derived_fields();
            let job = job.clone();
            let snapshot_jobs = job.status.is_terminal().then(|| inner.ordered_jobs());
            (job, snapshot_jobs)
        };

        debug!(job_id = %id, status = %job.status, "stage result recorded");
        if let Some(jobs) = snapshot_jobs {
            self.persist(jobs);
        }
        Ok(job)
    }

    /// Mark which stage a worker is presently executing for a job, or clear
    /// the marker when the worker releases it.
    pub async fn set_current_stage(
        &self,
        id: JobId,
        stage: Option<Stage>,
    ) -> Result<Job, PipelineError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or(PipelineError::NotFound { entity: "Job", id })?;
        if job.status.is_terminal() {
            return Err(PipelineError::AlreadyTerminal(id));
        }
        job.current_stage = stage;
        job.updated_at = chrono::Utc::now();
        job.refresh_derived_fields();
        Ok(job.clone())
    }

    /// Flag a job for cancellation.
    ///
    /// A queued job with no recorded progress becomes `cancelled` right
    /// here; a running job keeps its status until the executor observes the
    /// flag at the next stage boundary.
    pub async fn request_cancel(&self, id: JobId) -> Result<Job, PipelineError> {
        let (job, snapshot_jobs) = {
            let mut inner = self.inner.write().await;
            let job = inner
                .jobs
                .get_mut(&id)
                .ok_or(PipelineError::NotFound { entity: "Job", id })?;
            if job.status.is_terminal() {
                return Err(PipelineError::AlreadyTerminal(id));
            }
            job.cancel_requested = true;
            job.updated_at = chrono::Utc::now();
            job.refresh_derived_fields();
            let job = job.clone();
            let snapshot_jobs = job.status.is_terminal().then(|| inner.ordered_jobs());
            (job, snapshot_jobs)
        };

        info!(job_id = %id, status = %job.status, "cancellation requested");
        if let Some(jobs) = snapshot_jobs {
            self.persist(jobs);
        }
        Ok(job)
    }

    /// Remove a job record entirely. Returns the removed job so the caller
    /// can clean up its artifacts.
    pub async fn delete(&self, id: JobId) -> Result<Job, PipelineError> {
        let (job, snapshot_jobs) = {
            let mut inner = self.inner.write().await;
            let job = inner
                .jobs
                .remove(&id)
                .ok_or(PipelineError::NotFound { entity: "Job", id })?;
            inner.order.retain(|other| *other != id);
            (job, inner.ordered_jobs())
        };
        info!(job_id = %id, "job deleted");
        self.persist(snapshot_jobs);
        Ok(job)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the given jobs to the snapshot file, if one is configured.
    /// Failures are logged, never propagated; persistence is best effort.
    fn persist(&self, jobs: Vec<Job>) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(err) = snapshot::save(path, &jobs) {
            warn!(path = %path.display(), error = %err, "failed to persist job snapshot");
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
