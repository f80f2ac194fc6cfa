//! Speech recognition and synthesis stages.
//!
//! Both engines ship as Python packages and are invoked through their CLI
//! entry points: `whisper` for recognition, `edge-tts` for synthesis.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;
use vaani_core::stage::Stage;

use crate::error::EngineError;
use crate::ffmpeg::require_artifact;
use crate::segments::{self, Segment, SegmentDoc};
use crate::stage::{StageContext, StageEngine, StageOutput};
use crate::subprocess::run_checked;

/// Synthesis voice for each supported language.
const VOICES: [(&str, &str); 13] = [
    ("hi", "hi-IN-SwaraNeural"),
    ("bn", "bn-IN-TanishaaNeural"),
    ("ta", "ta-IN-PallaviNeural"),
    ("te", "te-IN-ShrutiNeural"),
    ("mr", "mr-IN-AarohiNeural"),
    ("gu", "gu-IN-DhwaniNeural"),
    ("kn", "kn-IN-SapnaNeural"),
    ("ml", "ml-IN-SobhanaNeural"),
    ("pa", "pa-IN-VaaniNeural"),
    ("or", "or-IN-SubhasiniNeural"),
    ("as", "as-IN-YashicaNeural"),
    ("ur", "ur-IN-GulNeural"),
    ("en", "en-US-AriaNeural"),
];

/// Default voice for codes outside the registry (non-strict mode).
const FALLBACK_VOICE: &str = "en-US-AriaNeural";

/// Synthesis voice for a language code.
pub fn voice_for(lang: &str) -> &'static str {
    VOICES
        .iter()
        .find(|(code, _)| *code == lang)
        .map(|(_, voice)| *voice)
        .unwrap_or(FALLBACK_VOICE)
}

/// Shape of whisper's `--output_format json` file. Segment entries carry
/// more fields than these; the rest are ignored.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    language: Option<String>,
    segments: Vec<Segment>,
}

/// Transcribe the extracted audio with whisper.
///
/// Whisper writes `<audio stem>.json` into the output directory, which by
/// layout construction is exactly the job's transcription path. The raw
/// report is then normalized in place and mirrored as a plain-text
/// transcript.
pub struct TranscribeStage;

#[async_trait]
impl StageEngine for TranscribeStage {
    fn stage(&self) -> Stage {
        Stage::Transcribe
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let audio = ctx.layout.audio_path(ctx.job_id);
        let out = ctx.layout.transcription_path(ctx.job_id);
        let out_dir = out.parent().map(|p| p.to_path_buf()).unwrap_or_default();

        if !audio.exists() {
            return Err(EngineError::MissingOutput {
                path: audio.to_string_lossy().into_owned(),
            });
        }

        let mut cmd = Command::new("python3");
        cmd.args(["-m", "whisper"])
            .arg(&audio)
            .args(["--model", "base", "--task", "transcribe"])
            .args(["--language", &ctx.from_lang])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(&out_dir);

        run_checked(&mut cmd, "whisper", None, ctx.timeout_for(self.stage())).await?;
        require_artifact(&out).await?;

        let bytes = tokio::fs::read(&out).await?;
        let report: WhisperOutput = serde_json::from_slice(&bytes)
            .map_err(|err| EngineError::InvalidOutput(format!("whisper JSON: {err}")))?;

        let doc = SegmentDoc {
            language: report.language.unwrap_or_else(|| ctx.from_lang.clone()),
            segments: report.segments,
        };
        segments::save(&out, &doc).await?;
        tokio::fs::write(ctx.layout.transcript_text_path(ctx.job_id), doc.full_text()).await?;

        debug!(job_id = %ctx.job_id, segments = doc.segments.len(), "audio transcribed");
        Ok(StageOutput::at(out))
    }
}

/// Synthesize the translated text as speech with edge-tts.
pub struct SynthesizeSpeechStage;

#[async_trait]
impl StageEngine for SynthesizeSpeechStage {
    fn stage(&self) -> Stage {
        Stage::SynthesizeSpeech
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let doc = segments::load(&ctx.layout.translation_path(ctx.job_id)).await?;
        let text = doc.full_text();
        if text.is_empty() {
            return Err(EngineError::ExecutionFailed {
                exit_code: None,
                stderr: "translation produced no text to synthesize".to_string(),
            });
        }

        let out = ctx.layout.translated_audio_path(ctx.job_id);
        let voice = voice_for(&ctx.to_lang);

        let mut cmd = Command::new("python3");
        cmd.args(["-m", "edge_tts"])
            .args(["--voice", voice])
            .args(["--text", &text])
            .arg("--write-media")
            .arg(&out);

        run_checked(&mut cmd, "edge-tts", None, ctx.timeout_for(self.stage())).await?;
        require_artifact(&out).await?;

        debug!(job_id = %ctx.job_id, voice, "speech synthesized");
        Ok(StageOutput::at(out))
    }
}
