use thiserror::Error;
use uuid::Uuid;

/// Programmer errors in time arithmetic. These fail loudly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("timescale must be positive, got {0}")]
    NonPositiveTimescale(i32),

    #[error("division by zero")]
    DivideByZero,

    #[error("value does not fit in timescale {0}")]
    TimescaleOverflow(i32),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Why a mutation was refused. The target is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("crop end must be after crop start")]
    EmptyRange,

    #[error("crop start must not be negative")]
    NegativeStart,

    #[error("crop end exceeds the source duration")]
    ExceedsSource,

    #[error("timeline position must not be negative")]
    NegativePosition,

    #[error("time value is invalid or indefinite")]
    NonFiniteTime,

    #[error("track not found: {0}")]
    TrackNotFound(Uuid),

    #[error("track already present: {0}")]
    DuplicateTrack(Uuid),

    #[error("index {index} out of bounds (timeline has {len} tracks)")]
    IndexOutOfBounds { index: usize, len: usize },
}
