//! Error types surfaced by the synthesis pipeline.

use crate::engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    /// The engine reported an internal error; the current call is lost.
    #[error("engine internal error")]
    Internal,

    /// The engine could not buffer the command; retry after a backoff.
    /// The core never retries automatically.
    #[error("engine command buffer is full")]
    BufferFull,

    /// Voice lookup matched nothing.
    #[error("no matching voice")]
    NotFound,

    /// The completion signal was not observed within the configured bound.
    /// A best-effort cancel has already been issued when this is returned.
    #[error("timed out waiting for synthesis to complete")]
    Timeout,

    /// A parameter was outside its documented range. Rejected before any
    /// engine command is issued.
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// The engine failed to start. Fatal: no synthesis is possible.
    #[error("engine initialization failed")]
    Initialization,

    /// Write failure while accumulating samples or emitting the container.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for SynthError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Internal => SynthError::Internal,
            EngineError::BufferFull => SynthError::BufferFull,
            EngineError::NotFound => SynthError::NotFound,
        }
    }
}
