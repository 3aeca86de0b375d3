//! Error types for regridding.

use thiserror::Error;

use projection::ProjectionError;
use regrid_common::TimeError;

/// Errors that can occur while regridding.
///
/// Per-record conditions (a footprint with unusable geometry, a point outside
/// the grid, an invalid value) are counted in [`crate::BinningStats`] and
/// never surface here; only conditions that stop a run do.
#[derive(Error, Debug)]
pub enum RegridError {
    /// A dense accumulator or output buffer could not be allocated.
    #[error("failed to allocate {cells} cells for regridding")]
    Allocation { cells: usize },

    /// Invalid grid definition.
    #[error("invalid grid definition: {0}")]
    InvalidGrid(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Caller-supplied buffers are inconsistent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A quadrilateral could not be formed from footprint corners.
    #[error("invalid footprint geometry: {0}")]
    InvalidGeometry(String),

    /// No grid cell received data during the whole run.
    #[error("no data: zero grid cells received valid observations")]
    EmptyResult,

    /// Projection setup error.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// Timestamp error.
    #[error(transparent)]
    Time(#[from] TimeError),

    /// Spill file error.
    #[error("spill file error: {0}")]
    Spill(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegridError {
    /// Create an InvalidGrid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a Spill error.
    pub fn spill(msg: impl Into<String>) -> Self {
        Self::Spill(msg.into())
    }

    /// Whether this error is the "no data" outcome rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult)
    }
}

/// Result type for regridding operations.
pub type Result<T> = std::result::Result<T, RegridError>;
