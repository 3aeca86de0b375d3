//! Command-line regridding service.
//!
//! Loads a run configuration (projection, grid and variable), reads point
//! observations or footprints from whitespace-separated text and writes the
//! regridded series as ASCII or XDR.

pub mod config;
pub mod input;
pub mod run;

pub use config::{load_run_config, RunConfig};
pub use input::{read_footprints, read_observations, InputRecords};
pub use run::{execute, validate_options, write_output, AggregatePeriod, RunOptions};
