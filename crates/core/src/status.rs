//! Job status and stage outcome enums, plus status derivation.
//!
//! A job's status is never stored as free-standing mutable state. It is
//! recomputed from the tail of the stage history, the cancel flag, and the
//! executor's in-flight marker, so readers can never observe a status that
//! contradicts the recorded progression.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Stable wire name (lowercase, matches the serde representation).
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of one stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageOutcome {
    /// Engine exited cleanly and the expected output exists and is non-empty.
    Success,
    /// Timeout or recoverable I/O problem; eligible for retry.
    TransientFailure,
    /// Invalid input or an unrecoverable engine error; ends the job.
    FatalFailure,
    /// The job was cancelled at this stage boundary.
    Cancelled,
}

/// Derive the job status from the last recorded stage attempt, the cancel
/// flag, and whether a worker currently has a stage in flight.
///
/// Rules, in order:
/// - A recorded `Cancelled` outcome is terminal `cancelled`.
/// - A recorded `FatalFailure` is terminal `failed`.
/// - A recorded `Success` on the final stage is terminal `completed`.
/// - Any other recorded attempt means the pipeline is mid-sequence: `running`.
/// - With no history at all: `running` if a worker already has a stage in
///   flight (its attempt will be recorded, cancelled or not), `cancelled`
///   if cancellation was requested before work started, otherwise `queued`.
pub fn derive_status(
    last: Option<(Stage, StageOutcome)>,
    cancel_requested: bool,
    stage_in_flight: bool,
) -> JobStatus {
    match last {
        Some((_, StageOutcome::Cancelled)) => JobStatus::Cancelled,
        Some((_, StageOutcome::FatalFailure)) => JobStatus::Failed,
        Some((stage, StageOutcome::Success)) if stage.is_last() => JobStatus::Completed,
        Some(_) => JobStatus::Running,
        None if stage_in_flight => JobStatus::Running,
        None if cancel_requested => JobStatus::Cancelled,
        None => JobStatus::Queued,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_job_is_queued() {
        assert_eq!(derive_status(None, false, false), JobStatus::Queued);
    }

    #[test]
    fn cancel_before_any_stage_is_terminal() {
        assert_eq!(derive_status(None, true, false), JobStatus::Cancelled);
    }

    #[test]
    fn claimed_job_is_running_before_first_record() {
        assert_eq!(derive_status(None, false, true), JobStatus::Running);
    }

    #[test]
    fn cancel_during_the_first_in_flight_stage_stays_running() {
        // The worker still owns the stage; the cancelled attempt it records
        // is what makes the job terminal.
        assert_eq!(derive_status(None, true, true), JobStatus::Running);
    }

    #[test]
    fn mid_sequence_success_is_running() {
        let last = Some((Stage::Transcribe, StageOutcome::Success));
        assert_eq!(derive_status(last, false, false), JobStatus::Running);
    }

    #[test]
    fn transient_failure_keeps_the_job_running() {
        let last = Some((Stage::Transcribe, StageOutcome::TransientFailure));
        assert_eq!(derive_status(last, false, true), JobStatus::Running);
    }

    #[test]
    fn fatal_failure_is_failed() {
        let last = Some((Stage::ExtractAudio, StageOutcome::FatalFailure));
        assert_eq!(derive_status(last, false, false), JobStatus::Failed);
    }

    #[test]
    fn final_stage_success_is_completed() {
        let last = Some((Stage::Finalize, StageOutcome::Success));
        assert_eq!(derive_status(last, false, false), JobStatus::Completed);
    }

    #[test]
    fn recorded_cancellation_wins_over_cancel_flag() {
        let last = Some((Stage::Translate, StageOutcome::Cancelled));
        assert_eq!(derive_status(last, true, false), JobStatus::Cancelled);
    }

    #[test]
    fn cancel_flag_alone_does_not_stop_a_running_sequence() {
        // The flag is honored at the next stage boundary; until a cancelled
        // record lands, the job still reads as running.
        let last = Some((Stage::Transcribe, StageOutcome::Success));
        assert_eq!(derive_status(last, true, true), JobStatus::Running);
    }

    #[test]
    fn terminal_statuses_are_exactly_the_three() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn outcome_serializes_kebab_case() {
        let json = serde_json::to_string(&StageOutcome::TransientFailure).unwrap();
        assert_eq!(json, "\"transient-failure\"");
    }
}
