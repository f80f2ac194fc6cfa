//! The stage adapter seam.
//!
//! Each pipeline stage is one [`StageEngine`] implementation that turns a
//! job's on-disk inputs into the stage's artifact. The executor drives a
//! fixed sequence of these through [`StageContext`], which carries the job
//! facts a stage is allowed to see.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use vaani_core::layout::ArtifactLayout;
use vaani_core::stage::Stage;
use vaani_core::types::JobId;

use crate::error::EngineError;

/// Per-invocation facts handed to a stage.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub job_id: JobId,
    pub source_path: PathBuf,
    pub from_lang: String,
    pub to_lang: String,
    pub layout: ArtifactLayout,
    /// Global multiplier applied to every stage's default deadline.
    pub timeout_multiplier: f64,
}

impl StageContext {
    /// Wall-clock deadline for the given stage under this context.
    pub fn timeout_for(&self, stage: Stage) -> Duration {
        stage.default_timeout().mul_f64(self.timeout_multiplier)
    }
}

/// What a finished stage hands back to the executor.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    /// Artifact this stage produced, when one exists on disk.
    pub output_path: Option<PathBuf>,
}

impl StageOutput {
    pub fn at(path: PathBuf) -> Self {
        Self {
            output_path: Some(path),
        }
    }
}

/// One pipeline stage backed by an external engine.
///
/// Implementations must be idempotent: outputs land at deterministic
/// job-keyed paths and a rerun simply overwrites them.
#[async_trait]
pub trait StageEngine: Send + Sync {
    /// Which stage of the canonical sequence this engine implements.
    fn stage(&self) -> Stage;

    /// Produce this stage's artifact for the job described by `ctx`.
    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError>;
}
