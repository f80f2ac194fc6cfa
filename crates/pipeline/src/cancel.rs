//! Per-job cancellation token registry.
//!
//! The executor registers a token when it picks a job up and drops the
//! registration when it puts the job down. Cancelling a job fires its token
//! if one is live; cancelling the registry fires every token at once during
//! shutdown. Every per-job token is a child of the master token.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vaani_core::error::PipelineError;
use vaani_core::types::JobId;
use vaani_store::{Job, JobStore};

pub struct CancelRegistry {
    /// Master token -- cancelled during shutdown.
    master: CancellationToken,
    tokens: RwLock<HashMap<JobId, CancellationToken>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self {
            master: CancellationToken::new(),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Create and track the token for a job entering execution.
    pub async fn register(&self, id: JobId) -> CancellationToken {
        let token = self.master.child_token();
        self.tokens.write().await.insert(id, token.clone());
        token
    }

    /// Drop the token for a job leaving execution.
    pub async fn unregister(&self, id: JobId) {
        self.tokens.write().await.remove(&id);
    }

    /// Fire the token for a running job. Returns whether a live token was
    /// found; a queued or terminal job has none.
    pub async fn cancel(&self, id: JobId) -> bool {
        match self.tokens.read().await.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Fire every live token. Used during shutdown.
    pub fn cancel_all(&self) {
        self.master.cancel();
    }
}

impl Default for CancelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Front door for cancellation requests.
///
/// Flags the job in the store first, then fires the running job's token so
/// the in-flight stage aborts. Order matters: a worker that misses the
/// token still sees the flag at its next stage boundary.
pub struct CancellationController {
    store: Arc<JobStore>,
    registry: Arc<CancelRegistry>,
}

impl CancellationController {
    pub fn new(store: Arc<JobStore>, registry: Arc<CancelRegistry>) -> Self {
        Self { store, registry }
    }

    /// Request cancellation of a job. Terminal jobs reject with
    /// `AlreadyTerminal`; unknown ids with `NotFound`.
    pub async fn cancel(&self, id: JobId) -> Result<Job, PipelineError> {
        let job = self.store.request_cancel(id).await?;
        let token_fired = self.registry.cancel(id).await;
        info!(job_id = %id, status = %job.status, token_fired, "cancellation accepted");
        Ok(job)
    }
}
