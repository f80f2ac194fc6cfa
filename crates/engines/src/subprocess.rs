//! Shared subprocess execution.
//!
//! Every engine adapter builds a [`tokio::process::Command`] for its tool
//! and delegates spawn, I/O capture, and timeout handling here. Children are
//! spawned with `kill_on_drop(true)`, so dropping the in-flight future
//! (timeout here, or a cancellation select in the executor) kills the
//! process rather than orphaning it.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::EngineError;

/// Maximum stdout or stderr size captured per stream (10 MiB). Output past
/// this limit is truncated to prevent memory exhaustion from verbose tools.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Spawn `cmd`, optionally pipe `stdin` to it, capture stdout/stderr, and
/// enforce `timeout`.
///
/// The caller sets the program and arguments; `tool` names the binary for
/// the not-found diagnostic. A non-zero exit is NOT an error at this level,
/// use [`run_checked`] for that.
pub async fn run_command(
    cmd: &mut Command,
    tool: &'static str,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<EngineOutput, EngineError> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let start = Instant::now();

    let mut child = cmd
        .spawn()
        .map_err(|source| EngineError::NotFound { tool, source })?;

    if let Some(payload) = stdin {
        if let Some(mut handle) = child.stdin.take() {
            // Best-effort write; a child that closes stdin early is allowed.
            let _ = handle.write_all(&payload).await;
            drop(handle);
        }
    }

    // Read the streams in spawned tasks so `child.wait()` can borrow the
    // child mutably at the same time.
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();
            Ok(EngineOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        Ok(Err(err)) => Err(EngineError::Io(err)),
        Err(_elapsed) => {
            // `child` is dropped here, which kills the process because of
            // `kill_on_drop(true)`.
            Err(EngineError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Like [`run_command`], but a non-zero exit becomes
/// [`EngineError::ExecutionFailed`].
pub async fn run_checked(
    cmd: &mut Command,
    tool: &'static str,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<EngineOutput, EngineError> {
    let output = run_command(cmd, tool, stdin, timeout).await?;
    if output.exit_code != 0 {
        return Err(EngineError::ExecutionFailed {
            exit_code: Some(output.exit_code),
            stderr: output.stderr,
        });
    }
    Ok(output)
}

/// Read an entire output stream into a buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}
