use std::sync::Arc;

use vaani_core::layout::ArtifactLayout;
use vaani_pipeline::{CancellationController, Scheduler};
use vaani_store::JobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Source of truth for job records.
    pub store: Arc<JobStore>,
    /// Worker pool and admission queue.
    pub scheduler: Arc<Scheduler>,
    /// Front door for cancellation requests.
    pub controller: Arc<CancellationController>,
    /// Artifact path arithmetic.
    pub layout: ArtifactLayout,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
