//! Caption generation stage.
//!
//! Renders the translated segments as SubRip text. Pure formatting, no
//! external engine.

use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::debug;
use vaani_core::stage::Stage;

use crate::error::EngineError;
use crate::segments::{self, Segment};
use crate::stage::{StageContext, StageEngine, StageOutput};

/// Format seconds as an SRT timestamp, `HH:MM:SS,mmm`.
fn srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// Render segments as an SRT document. Empty segments are skipped; cue
/// numbering stays contiguous.
fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut cue = 1;
    for seg in segments {
        let text = seg.text.trim();
        if text.is_empty() {
            continue;
        }
        let _ = write!(
            out,
            "{cue}\n{} --> {}\n{text}\n\n",
            srt_timestamp(seg.start),
            srt_timestamp(seg.end)
        );
        cue += 1;
    }
    out
}

/// Write the translated segments as an SRT caption file.
pub struct GenerateCaptionsStage;

#[async_trait]
impl StageEngine for GenerateCaptionsStage {
    fn stage(&self) -> Stage {
        Stage::GenerateCaptions
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let doc = segments::load(&ctx.layout.translation_path(ctx.job_id)).await?;
        let srt = render_srt(&doc.segments);

        let out = ctx.layout.captions_path(ctx.job_id);
        tokio::fs::write(&out, srt).await?;
        debug!(job_id = %ctx.job_id, segments = doc.segments.len(), "captions written");
        Ok(StageOutput::at(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_formats_hours_minutes_seconds_millis() {
        assert_eq!(srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(srt_timestamp(1.5), "00:00:01,500");
        assert_eq!(srt_timestamp(61.042), "00:01:01,042");
        assert_eq!(srt_timestamp(3661.0), "01:01:01,000");
    }

    #[test]
    fn negative_offsets_clamp_to_zero() {
        assert_eq!(srt_timestamp(-2.0), "00:00:00,000");
    }

    #[test]
    fn renders_numbered_cues() {
        let segments = vec![
            Segment {
                start: 0.0,
                end: 1.0,
                text: "पहला".to_string(),
            },
            Segment {
                start: 1.0,
                end: 2.5,
                text: "दूसरा".to_string(),
            },
        ];
        let srt = render_srt(&segments);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,000\nपहला\n\n"));
        assert!(srt.contains("2\n00:00:01,000 --> 00:00:02,500\nदूसरा\n\n"));
    }

    #[test]
    fn empty_segments_are_skipped_without_gaps_in_numbering() {
        let segments = vec![
            Segment {
                start: 0.0,
                end: 1.0,
                text: "  ".to_string(),
            },
            Segment {
                start: 1.0,
                end: 2.0,
                text: "kept".to_string(),
            },
        ];
        let srt = render_srt(&segments);
        assert!(srt.starts_with("1\n"));
        assert!(!srt.contains("2\n"));
    }
}
