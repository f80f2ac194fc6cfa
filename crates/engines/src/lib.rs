//! External engine adapters.
//!
//! One [`StageEngine`] per pipeline stage, a shared subprocess runner with
//! timeout and kill-on-drop semantics, and health probes for the tools the
//! pipeline shells out to.

use std::sync::Arc;

pub mod captions;
pub mod error;
pub mod ffmpeg;
pub mod health;
pub mod segments;
pub mod speech;
pub mod stage;
pub mod subprocess;
pub mod translate;

pub use error::EngineError;
pub use stage::{StageContext, StageEngine, StageOutput};

use captions::GenerateCaptionsStage;
use ffmpeg::{AssembleVideoStage, ExtractAudioStage, FinalizeStage, IngestValidateStage};
use speech::{SynthesizeSpeechStage, TranscribeStage};
use translate::TranslateStage;

/// The production engine set, in canonical sequence order.
pub fn default_engines() -> Vec<Arc<dyn StageEngine>> {
    vec![
        Arc::new(IngestValidateStage),
        Arc::new(ExtractAudioStage),
        Arc::new(TranscribeStage),
        Arc::new(TranslateStage),
        Arc::new(SynthesizeSpeechStage),
        Arc::new(GenerateCaptionsStage),
        Arc::new(AssembleVideoStage),
        Arc::new(FinalizeStage),
    ]
}
