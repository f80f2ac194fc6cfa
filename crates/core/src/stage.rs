//! The fixed pipeline stage sequence.
//!
//! Every job runs the same eight stages in the same order. Stage names are
//! stable wire identifiers: they appear in status responses, stage history
//! records, and log fields.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One unit of work in the pipeline, delegated to an external engine or a
/// local transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Probe the uploaded file and reject anything that is not a playable video.
    IngestValidate,
    /// Extract a mono 16 kHz WAV track for the speech recognizer.
    ExtractAudio,
    /// Speech-to-text on the extracted audio.
    Transcribe,
    /// Translate the transcript segments into the target language.
    Translate,
    /// Synthesize translated speech.
    SynthesizeSpeech,
    /// Render translated captions as SRT.
    GenerateCaptions,
    /// Re-mux the original video with the translated audio and captions.
    AssembleVideo,
    /// Move the assembled file into its served location.
    Finalize,
}

/// Canonical execution order. Stage history for any job is always a prefix
/// of this sequence (repeats allowed only for retries of the same stage).
pub const SEQUENCE: [Stage; 8] = [
    Stage::IngestValidate,
    Stage::ExtractAudio,
    Stage::Transcribe,
    Stage::Translate,
    Stage::SynthesizeSpeech,
    Stage::GenerateCaptions,
    Stage::AssembleVideo,
    Stage::Finalize,
];

impl Stage {
    /// Stable wire name (kebab-case, matches the serde representation).
    pub fn name(self) -> &'static str {
        match self {
            Stage::IngestValidate => "ingest-validate",
            Stage::ExtractAudio => "extract-audio",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::SynthesizeSpeech => "synthesize-speech",
            Stage::GenerateCaptions => "generate-captions",
            Stage::AssembleVideo => "assemble-video",
            Stage::Finalize => "finalize",
        }
    }

    /// Position in [`SEQUENCE`].
    pub fn index(self) -> usize {
        SEQUENCE
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// The stage that follows this one, or `None` after the last.
    pub fn next(self) -> Option<Stage> {
        SEQUENCE.get(self.index() + 1).copied()
    }

    /// Whether this is the last stage of the sequence.
    pub fn is_last(self) -> bool {
        self == Stage::Finalize
    }

    /// Default wall-clock deadline for one attempt of this stage.
    ///
    /// Exceeding the deadline counts as a transient failure and consumes
    /// one retry. Transcription and synthesis dominate: both run a model
    /// over the full audio track.
    pub fn default_timeout(self) -> Duration {
        let secs = match self {
            Stage::IngestValidate => 30,
            Stage::ExtractAudio => 120,
            Stage::Transcribe => 600,
            Stage::Translate => 300,
            Stage::SynthesizeSpeech => 600,
            Stage::GenerateCaptions => 60,
            Stage::AssembleVideo => 300,
            Stage::Finalize => 30,
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
