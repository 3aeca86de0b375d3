//! Configuration for a regridding run.

use serde::{Deserialize, Serialize};

use regrid_common::MISSING_VALUE;

use crate::error::{RegridError, Result};
use crate::types::AggregationMethod;

/// Configuration for the regridding engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegridConfig {
    /// How contributions to a cell are combined.
    pub aggregation_method: AggregationMethod,

    /// Values below this are excluded from aggregation.
    pub minimum_valid_value: f64,

    /// Hourly timesteps merged into one output timestep (1 = hourly output).
    pub hours_per_period: usize,

    /// Bin hourly timesteps on the rayon thread pool.
    pub parallel: bool,

    /// Total output points above which compacted timesteps are spilled to a
    /// temporary file while the run progresses (0 = never spill).
    pub spill_threshold_points: usize,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            aggregation_method: AggregationMethod::Mean,
            minimum_valid_value: MISSING_VALUE + 1.0,
            hours_per_period: 1,
            parallel: true,
            spill_threshold_points: 0,
        }
    }
}

impl RegridConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REGRID_AGGREGATION") {
            if let Some(method) = AggregationMethod::parse(&val) {
                config.aggregation_method = method;
            }
        }

        if let Ok(val) = std::env::var("REGRID_MINIMUM_VALID") {
            if let Ok(minimum) = val.parse() {
                config.minimum_valid_value = minimum;
            }
        }

        if let Ok(val) = std::env::var("REGRID_HOURS_PER_PERIOD") {
            if let Ok(hours) = val.parse() {
                config.hours_per_period = hours;
            }
        }

        if let Ok(val) = std::env::var("REGRID_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("REGRID_SPILL_THRESHOLD") {
            if let Ok(points) = val.parse() {
                config.spill_threshold_points = points;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.hours_per_period == 0 {
            return Err(RegridError::invalid_config("hours_per_period must be > 0"));
        }

        if self.minimum_valid_value.is_nan() {
            return Err(RegridError::invalid_config(
                "minimum_valid_value must be a number",
            ));
        }

        Ok(())
    }
}
