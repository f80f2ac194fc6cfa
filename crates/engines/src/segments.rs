//! Timed transcript segments shared by the speech, translation, and caption
//! stages.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One timed span of speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Start offset in seconds from the beginning of the audio.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
    pub text: String,
}

/// A transcript or translation document: ordered segments plus the language
/// they are written in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDoc {
    pub language: String,
    pub segments: Vec<Segment>,
}

impl SegmentDoc {
    /// All segment texts joined into one paragraph.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Read a segment document from a JSON artifact.
pub async fn load(path: &Path) -> Result<SegmentDoc, EngineError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            EngineError::MissingOutput {
                path: path.to_string_lossy().into_owned(),
            }
        } else {
            EngineError::Io(err)
        }
    })?;
    serde_json::from_slice(&bytes).map_err(|err| EngineError::InvalidOutput(err.to_string()))
}

/// Write a segment document as a JSON artifact.
pub async fn save(path: &Path, doc: &SegmentDoc) -> Result<(), EngineError> {
    let bytes =
        serde_json::to_vec_pretty(doc).map_err(|err| EngineError::InvalidOutput(err.to_string()))?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
