//! Error type for external engine invocations.

use vaani_core::status::StageOutcome;

/// Failure modes of one engine invocation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine binary not found: {tool}")]
    NotFound {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("engine timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("engine exited with code {exit_code:?}: {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("engine produced no output at {path}")]
    MissingOutput { path: String },

    #[error("engine produced unparseable output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// How the executor should record this failure.
    ///
    /// Timeouts and raw I/O failures are worth retrying; an engine that ran
    /// and rejected its input will reject it again.
    pub fn classification(&self) -> StageOutcome {
        match self {
            EngineError::Timeout { .. } | EngineError::Io(_) => StageOutcome::TransientFailure,
            EngineError::NotFound { .. }
            | EngineError::ExecutionFailed { .. }
            | EngineError::MissingOutput { .. }
            | EngineError::InvalidOutput(_) => StageOutcome::FatalFailure,
        }
    }

    /// Short diagnostic safe to store on the job record. Engine stderr is
    /// capped so a chatty tool cannot bloat the record.
    pub fn diagnostic(&self) -> String {
        const MAX_LEN: usize = 500;
        let mut text = self.to_string();
        if text.len() > MAX_LEN {
            let mut end = MAX_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            text.push_str("...");
        }
        text
    }
}
