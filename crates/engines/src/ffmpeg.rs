//! FFmpeg/FFprobe stage adapters.
//!
//! Four stages ride on the ffmpeg toolchain: source validation (ffprobe),
//! audio extraction, video assembly, and finalization (a rename, no
//! subprocess at all).

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;
use vaani_core::stage::Stage;

use crate::error::EngineError;
use crate::stage::{StageContext, StageEngine, StageOutput};
use crate::subprocess::run_checked;

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

impl FfprobeOutput {
    fn stream_of(&self, kind: &str) -> Option<&FfprobeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    }

    pub fn has_video_stream(&self) -> bool {
        self.stream_of("video").is_some()
    }

    pub fn has_audio_stream(&self) -> bool {
        self.stream_of("audio").is_some()
    }

    /// Container duration in seconds, falling back to the video stream's.
    pub fn duration_secs(&self) -> f64 {
        let format_duration = self
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok());
        format_duration
            .or_else(|| {
                self.stream_of("video")
                    .and_then(|s| s.duration.as_deref())
                    .and_then(|d| d.parse::<f64>().ok())
            })
            .unwrap_or(0.0)
    }
}

/// Run `ffprobe` on a media file and parse its JSON report.
pub async fn probe(path: &Path, ctx: &StageContext) -> Result<FfprobeOutput, EngineError> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path);

    let output = run_checked(
        &mut cmd,
        "ffprobe",
        None,
        ctx.timeout_for(Stage::IngestValidate),
    )
    .await?;
    serde_json::from_str(&output.stdout)
        .map_err(|err| EngineError::InvalidOutput(format!("ffprobe JSON: {err}")))
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Probe the uploaded source and reject anything that is not a playable
/// video with an audio track.
pub struct IngestValidateStage;

#[async_trait]
impl StageEngine for IngestValidateStage {
    fn stage(&self) -> Stage {
        Stage::IngestValidate
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        if !ctx.source_path.exists() {
            return Err(EngineError::MissingOutput {
                path: ctx.source_path.to_string_lossy().into_owned(),
            });
        }

        let report = probe(&ctx.source_path, ctx).await?;
        if !report.has_video_stream() {
            return Err(EngineError::ExecutionFailed {
                exit_code: None,
                stderr: "source has no video stream".to_string(),
            });
        }
        if !report.has_audio_stream() {
            return Err(EngineError::ExecutionFailed {
                exit_code: None,
                stderr: "source has no audio track to translate".to_string(),
            });
        }
        let duration = report.duration_secs();
        if duration <= 0.0 {
            return Err(EngineError::ExecutionFailed {
                exit_code: None,
                stderr: "source has zero duration".to_string(),
            });
        }

        debug!(job_id = %ctx.job_id, duration_secs = duration, "source validated");
        Ok(StageOutput::default())
    }
}

/// Extract the source audio as 16kHz mono PCM, the input format the speech
/// recognizer expects.
pub struct ExtractAudioStage;

#[async_trait]
impl StageEngine for ExtractAudioStage {
    fn stage(&self) -> Stage {
        Stage::ExtractAudio
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let out = ctx.layout.audio_path(ctx.job_id);

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .arg("-i")
            .arg(&ctx.source_path)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(&out);

        run_checked(&mut cmd, "ffmpeg", None, ctx.timeout_for(self.stage())).await?;
        require_artifact(&out).await?;
        Ok(StageOutput::at(out))
    }
}

/// Re-mux the original video with the synthesized audio track, burning the
/// caption file in as a soft subtitle stream when one exists.
pub struct AssembleVideoStage;

#[async_trait]
impl StageEngine for AssembleVideoStage {
    fn stage(&self) -> Stage {
        Stage::AssembleVideo
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let audio = ctx.layout.translated_audio_path(ctx.job_id);
        let captions = ctx.layout.captions_path(ctx.job_id);
        let out = ctx.layout.assembled_path(ctx.job_id);

        if !audio.exists() {
            return Err(EngineError::MissingOutput {
                path: audio.to_string_lossy().into_owned(),
            });
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y").arg("-i").arg(&ctx.source_path).arg("-i").arg(&audio);
        let with_captions = captions.exists();
        if with_captions {
            cmd.arg("-i").arg(&captions);
            cmd.args([
                "-map", "0:v:0", "-map", "1:a:0", "-map", "2:s:0", "-c:v", "copy", "-c:a", "aac",
                "-c:s", "mov_text",
            ]);
        } else {
            cmd.args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac"]);
        }
        cmd.arg("-shortest").arg(&out);

        run_checked(&mut cmd, "ffmpeg", None, ctx.timeout_for(self.stage())).await?;
        require_artifact(&out).await?;
        debug!(job_id = %ctx.job_id, with_captions, "video assembled");
        Ok(StageOutput::at(out))
    }
}

/// Move the assembled video into the served `processed` directory.
pub struct FinalizeStage;

#[async_trait]
impl StageEngine for FinalizeStage {
    fn stage(&self) -> Stage {
        Stage::Finalize
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, EngineError> {
        let assembled = ctx.layout.assembled_path(ctx.job_id);
        let out = ctx.layout.final_path(ctx.job_id);

        if !assembled.exists() {
            return Err(EngineError::MissingOutput {
                path: assembled.to_string_lossy().into_owned(),
            });
        }
        tokio::fs::rename(&assembled, &out).await?;
        Ok(StageOutput::at(out))
    }
}

/// Fail with [`EngineError::MissingOutput`] when an engine exited cleanly
/// but left nothing on disk.
pub(crate) async fn require_artifact(path: &Path) -> Result<(), EngineError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) | Err(_) => Err(EngineError::MissingOutput {
            path: path.to_string_lossy().into_owned(),
        }),
    }
}
