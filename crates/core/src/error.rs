//! Shared error taxonomy for the pipeline crates.

use crate::types::JobId;

/// Domain-level errors surfaced by the job store, scheduler, and
/// cancellation paths. The HTTP layer maps these onto response codes.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Entity lookup failed.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: JobId },

    /// Input rejected before a job was created.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation targets a job that already reached a terminal state.
    #[error("job {0} is already in a terminal state")]
    AlreadyTerminal(JobId),

    /// The admission queue is at capacity. Retryable by the caller.
    #[error("admission queue is full")]
    QueueFull,

    /// Unexpected internal failure. Details are logged, not surfaced.
    #[error("internal error: {0}")]
    Internal(String),
}
