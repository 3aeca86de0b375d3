//! Common types shared across the regridding crates.

pub mod error;
pub mod observation;
pub mod time;

pub use error::{TimeError, TimeResult};
pub use observation::{is_valid_value, Corner, Footprint, Observation, MISSING_VALUE};
pub use time::{RegridContext, Timestamp, SECONDS_PER_HOUR};
