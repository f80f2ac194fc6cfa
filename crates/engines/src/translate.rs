//! Text translation stage.
//!
//! Argos Translate has no standalone CLI worth scripting, so the stage
//! drives it through an inline Python program: the transcript document goes
//! in on stdin as JSON, the translated document comes back on stdout.

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;
use vaani_core::stage::Stage;

use crate::error::EngineError;
use crate::segments::{self, Segment, SegmentDoc};
use crate::stage::{StageContext, StageEngine, StageOutput};
use crate::subprocess::run_checked;

/// Reads `{"from", "to", "segments"}` from stdin, translates each segment
/// text, and prints `{"language", "segments"}`.
const TRANSLATE_PROGRAM: &str = r#"
import json
import sys

import argostranslate.translate

payload = json.load(sys.stdin)
src, dst = payload["from"], payload["to"]
segments = []
for seg in payload["segments"]:
    segments.append({
        "start": seg["start"],
        "end": seg["end"],
        "text": argostranslate.translate.translate(seg["text"], src, dst),
    })
json.dump({"language": dst, "segments": segments}, sys.stdout, ensure_ascii=False)
"#;

#[derive(Serialize)]
struct TranslateRequest<'a> {
    from: &'a str,
    to: &'a str,
    segments: &'a [Segment],
}

/// Translate the transcribed segments into the target language.
pub struct TranslateStage;

#[async_trait]
impl StageEngine for TranslateStage {
    fn stage(&self) -> Stage {
        Stage::Translate
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let transcript = segments::load(&ctx.layout.transcription_path(ctx.job_id)).await?;
        let request = TranslateRequest {
            from: &ctx.from_lang,
            to: &ctx.to_lang,
            segments: &transcript.segments,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|err| EngineError::InvalidOutput(err.to_string()))?;

        let mut cmd = Command::new("python3");
        cmd.args(["-c", TRANSLATE_PROGRAM]);

        let output = run_checked(
            &mut cmd,
            "argos-translate",
            Some(payload),
            ctx.timeout_for(self.stage()),
        )
        .await?;

        let doc: SegmentDoc = serde_json::from_str(output.stdout.trim())
            .map_err(|err| EngineError::InvalidOutput(format!("translator JSON: {err}")))?;
        if doc.segments.len() != transcript.segments.len() {
            return Err(EngineError::InvalidOutput(format!(
                "translator returned {} segments for {} inputs",
                doc.segments.len(),
                transcript.segments.len()
            )));
        }

        let out = ctx.layout.translation_path(ctx.job_id);
        segments::save(&out, &doc).await?;
        debug!(job_id = %ctx.job_id, segments = doc.segments.len(), "transcript translated");
        Ok(StageOutput::at(out))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use vaani_core::layout::ArtifactLayout;
    use vaani_core::types::JobId;

    use super::*;

    #[test]
    fn request_serializes_with_plain_keys() {
        let segments = vec![Segment {
            start: 0.0,
            end: 1.0,
            text: "hello".to_string(),
        }];
        let request = TranslateRequest {
            from: "en",
            to: "hi",
            segments: &segments,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["from"], "en");
        assert_eq!(json["to"], "hi");
        assert_eq!(json["segments"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn translate_requires_the_transcription_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StageContext {
            job_id: JobId::new(),
            source_path: dir.path().join("src.mp4"),
            from_lang: "en".to_string(),
            to_lang: "hi".to_string(),
            layout: ArtifactLayout::new(dir.path()),
            timeout_multiplier: 1.0,
        };
        let err = TranslateStage.run(&ctx).await.unwrap_err();
        assert_matches!(err, EngineError::MissingOutput { .. });
    }
}
