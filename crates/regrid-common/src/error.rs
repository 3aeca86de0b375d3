//! Error types for timestamp handling.

use thiserror::Error;

/// Result type alias using TimeError.
pub type TimeResult<T> = Result<T, TimeError>;

/// Errors raised while interpreting YYYYMMDDHHMMSS timestamps.
#[derive(Debug, Error)]
pub enum TimeError {
    #[error("invalid timestamp {0}: expected YYYYMMDDHHMMSS")]
    InvalidTimestamp(i64),

    #[error("invalid timestamp text '{0}'")]
    InvalidFormat(String),

    #[error("hour count must be at least 1, got {0}")]
    InvalidHours(usize),
}
