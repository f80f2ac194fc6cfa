//! Engine dependency probes for the health endpoint.

use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;

use crate::subprocess::run_command;

const FFMPEG_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const WHISPER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Availability of the external tools the pipeline shells out to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineHealth {
    pub ffmpeg: bool,
    pub whisper: bool,
}

impl EngineHealth {
    pub fn all_available(&self) -> bool {
        self.ffmpeg && self.whisper
    }
}

/// Probe every engine dependency concurrently.
pub async fn check_engines() -> EngineHealth {
    let (ffmpeg, whisper) = tokio::join!(check_ffmpeg(), check_whisper());
    EngineHealth { ffmpeg, whisper }
}

async fn check_ffmpeg() -> bool {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-version");
    matches!(
        run_command(&mut cmd, "ffmpeg", None, FFMPEG_PROBE_TIMEOUT).await,
        Ok(output) if output.exit_code == 0
    )
}

async fn check_whisper() -> bool {
    let mut cmd = Command::new("python3");
    cmd.args(["-c", "import whisper; print('OK')"]);
    matches!(
        run_command(&mut cmd, "whisper", None, WHISPER_PROBE_TIMEOUT).await,
        Ok(output) if output.exit_code == 0 && output.stdout.contains("OK")
    )
}
