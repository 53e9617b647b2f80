use thiserror::Error;

/// All errors produced by lumen-core.
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("inference error: {0}")]
    Inference(String),

    #[error("an analysis is already in flight")]
    ScanInFlight,

    #[error("analysis was cancelled before a result could be surfaced")]
    Cancelled,

    #[error("no history entry with id {id}")]
    NotFound { id: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("speech worker is no longer running")]
    SpeechUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LumenError>;
