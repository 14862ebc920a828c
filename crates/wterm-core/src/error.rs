use thiserror::Error;

/// Errors produced by the wterm protocol layer.
#[derive(Debug, Error)]
pub enum TermError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// A command or save is already in flight on this session.
    #[error("session busy: {0}")]
    Busy(String),

    #[error("no file is open for editing")]
    NoEditTarget,

    #[error("not connected")]
    NotConnected,

    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type TermResult<T> = Result<T, TermError>;
