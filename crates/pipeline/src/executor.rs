//! Stage executor.
//!
//! Drives one job through the canonical stage sequence: runs each engine
//! under its deadline, records every attempt in the job's history, retries
//! transient failures with exponential backoff, and honors cancellation at
//! stage boundaries and mid-stage through the job's token.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vaani_core::layout::ArtifactLayout;
use vaani_core::stage::Stage;
use vaani_core::status::StageOutcome;
use vaani_core::types::{JobId, Timestamp};
use vaani_engines::{StageContext, StageEngine};
use vaani_store::{JobStore, StageResult};

use crate::cancel::CancelRegistry;
use crate::cleanup;

/// Retries allowed per stage after the first attempt.
const MAX_RETRIES: u32 = 2;

/// First retry delay; doubles per retry.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// What one stage attempt resolved to, executor-side.
enum StepOutcome {
    Advance,
    Retry { attempt: u32 },
    Stop,
}

pub struct PipelineExecutor {
    store: Arc<JobStore>,
    engines: Vec<Arc<dyn StageEngine>>,
    cancels: Arc<CancelRegistry>,
    layout: ArtifactLayout,
    timeout_multiplier: f64,
}

impl PipelineExecutor {
    pub fn new(
        store: Arc<JobStore>,
        engines: Vec<Arc<dyn StageEngine>>,
        cancels: Arc<CancelRegistry>,
        layout: ArtifactLayout,
        timeout_multiplier: f64,
    ) -> Self {
        Self {
            store,
            engines,
            cancels,
            layout,
            timeout_multiplier,
        }
    }

    /// Execute every stage of one job. Called by exactly one worker per
    /// job; the scheduler guarantees no job is dispatched twice.
    pub async fn run_job(&self, id: JobId) {
        let job = match self.store.get(id).await {
            Ok(job) => job,
            Err(err) => {
                warn!(job_id = %id, error = %err, "dispatched job vanished");
                return;
            }
        };
        if job.status.is_terminal() {
            debug!(job_id = %id, status = %job.status, "skipping terminal job");
            return;
        }

        let token = self.cancels.register(id).await;
        let ctx = StageContext {
            job_id: id,
            source_path: job.source_path.clone(),
            from_lang: job.from_lang.clone(),
            to_lang: job.to_lang.clone(),
            layout: self.layout.clone(),
            timeout_multiplier: self.timeout_multiplier,
        };
        let started = Utc::now();
        info!(job_id = %id, from = %job.from_lang, to = %job.to_lang, "job execution started");

        self.run_stages(id, &ctx, &token).await;

        self.cancels.unregister(id).await;
        self.finish(id, started).await;
    }

    async fn run_stages(&self, id: JobId, ctx: &StageContext, token: &CancellationToken) {
        'stages: for engine in &self.engines {
            let stage = engine.stage();

            // Boundary check: a cancel flagged while the previous stage ran
            // stops the job before this one starts.
            match self.store.get(id).await {
                Ok(job) if job.cancel_requested => {
                    let now = Utc::now();
                    self.record(id, cancelled_result(stage, 0, now, now)).await;
                    break 'stages;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(job_id = %id, error = %err, "job disappeared mid-run");
                    break 'stages;
                }
            }

            let mut attempt: u32 = 0;
            loop {
                match self
                    .run_attempt(id, engine.as_ref(), ctx, token, attempt)
                    .await
                {
                    StepOutcome::Advance => continue 'stages,
                    StepOutcome::Retry { attempt: next } => attempt = next,
                    StepOutcome::Stop => break 'stages,
                }

                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                debug!(
                    job_id = %id,
                    stage = %stage,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::select! {
                    _ = token.cancelled() => {
                        let now = Utc::now();
                        self.record(id, cancelled_result(stage, attempt, now, now)).await;
                        break 'stages;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    /// One attempt of one stage: run the engine under cancellation, record
    /// the result, and decide what happens next.
    async fn run_attempt(
        &self,
        id: JobId,
        engine: &dyn StageEngine,
        ctx: &StageContext,
        token: &CancellationToken,
        attempt: u32,
    ) -> StepOutcome {
        let stage = engine.stage();
        if self
            .store
            .set_current_stage(id, Some(stage))
            .await
            .is_err()
        {
            return StepOutcome::Stop;
        }

        let started_at = Utc::now();
        // Dropping the engine future on cancellation kills any child
        // process it spawned (kill_on_drop).
        let run = tokio::select! {
            _ = token.cancelled() => None,
            result = engine.run(ctx) => Some(result),
        };
        let finished_at = Utc::now();

        match run {
            None => {
                info!(job_id = %id, stage = %stage, "stage aborted by cancellation");
                self.record(id, cancelled_result(stage, attempt, started_at, finished_at))
                    .await;
                StepOutcome::Stop
            }
            Some(Ok(output)) => {
                debug!(job_id = %id, stage = %stage, attempt, "stage succeeded");
                self.record(
                    id,
                    StageResult {
                        stage,
                        outcome: StageOutcome::Success,
                        attempt,
                        started_at,
                        finished_at,
                        output_path: output.output_path,
                        error: None,
                    },
                )
                .await;
                StepOutcome::Advance
            }
            Some(Err(err)) => {
                let transient = err.classification() == StageOutcome::TransientFailure;
                let retryable = transient && attempt < MAX_RETRIES;
                let (outcome, diagnostic) = if retryable {
                    (StageOutcome::TransientFailure, err.diagnostic())
                } else if transient {
                    (
                        StageOutcome::FatalFailure,
                        format!("retries exhausted: {}", err.diagnostic()),
                    )
                } else {
                    (StageOutcome::FatalFailure, err.diagnostic())
                };
                warn!(
                    job_id = %id,
                    stage = %stage,
                    attempt,
                    outcome = ?outcome,
                    error = %err,
                    "stage failed"
                );
                self.record(
                    id,
                    StageResult {
                        stage,
                        outcome,
                        attempt,
                        started_at,
                        finished_at,
                        output_path: None,
                        error: Some(diagnostic),
                    },
                )
                .await;
                if retryable {
                    StepOutcome::Retry {
                        attempt: attempt + 1,
                    }
                } else {
                    StepOutcome::Stop
                }
            }
        }
    }

    async fn record(&self, id: JobId, result: StageResult) {
        if let Err(err) = self.store.append_stage_result(id, result).await {
            // A lost record here would leave the stored status behind the
            // real progression, so surface it loudly.
            warn!(job_id = %id, error = %err, "failed to record stage result");
        }
    }

    async fn finish(&self, id: JobId, started: Timestamp) {
        let Ok(job) = self.store.get(id).await else {
            return;
        };
        if job.status.is_terminal() {
            cleanup::remove_intermediates(&self.layout, id).await;
        }
        info!(
            job_id = %id,
            status = %job.status,
            stages_recorded = job.stage_history.len(),
            duration_ms = (Utc::now() - started).num_milliseconds(),
            "job execution finished"
        );
    }
}

fn cancelled_result(
    stage: Stage,
    attempt: u32,
    started_at: Timestamp,
    finished_at: Timestamp,
) -> StageResult {
    StageResult {
        stage,
        outcome: StageOutcome::Cancelled,
        attempt,
        started_at,
        finished_at,
        output_path: None,
        error: Some("cancellation requested".to_string()),
    }
}
