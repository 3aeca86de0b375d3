//! Error types for projection setup.

use thiserror::Error;

/// Result type alias using ProjectionError.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Errors raised while building a projection from its parameters.
///
/// Projecting individual points never fails: out-of-domain input produces
/// non-finite coordinates which the caller filters.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("invalid projection parameters: {0}")]
    InvalidParameters(String),

    #[error("unsupported projection: {0}")]
    Unsupported(String),
}

impl ProjectionError {
    /// Create an InvalidParameters error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }
}
