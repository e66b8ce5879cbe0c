use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThumbError {
    #[error("thumbnail generation failed: {0}")]
    Generation(String),

    #[error("media source unavailable: {0}")]
    SourceUnavailable(Uuid),

    #[error("thumbnail request cancelled")]
    Cancelled,

    #[error("thumbnail worker went away")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, ThumbError>;
