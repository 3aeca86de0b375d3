//! Geolocated sensor records consumed by the regridding engine.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Sentinel marking "no valid value". Never emitted in regridded output.
pub const MISSING_VALUE: f64 = -9999.0;

/// Whether `value` may take part in aggregation: finite, not the missing
/// sentinel and not below `minimum_valid`.
#[inline]
pub fn is_valid_value(value: f64, minimum_valid: f64) -> bool {
    value.is_finite() && value != MISSING_VALUE && value >= minimum_valid
}

/// A single timestamped point observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Timestamp,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Meters above mean sea level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    pub value: f64,
    /// Second component, e.g. the v part of a wind vector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<f64>,
    /// Weight for weighted aggregation, 1 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Observation {
    /// Create a surface observation with a single value.
    pub fn new(timestamp: Timestamp, longitude: f64, latitude: f64, value: f64) -> Self {
        Self {
            timestamp,
            longitude,
            latitude,
            elevation: None,
            value,
            value2: None,
            weight: None,
            note: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_value2(mut self, value2: f64) -> Self {
        self.value2 = Some(value2);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Weight used by weighted aggregation.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    /// Whether longitude and latitude are inside the geographic domain.
    pub fn has_valid_location(&self) -> bool {
        valid_location(self.longitude, self.latitude)
    }
}

/// Corner positions of a footprint, in the order the corners are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    Southwest = 0,
    Southeast = 1,
    Northwest = 2,
    Northeast = 3,
}

/// The ground projection of a sensor pixel: four (lon, lat) corners with one
/// value and one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub timestamp: Timestamp,
    /// (lon, lat) corners ordered SW, SE, NW, NE
    pub corners: [(f64, f64); 4],
    pub value: f64,
}

impl Footprint {
    pub fn new(timestamp: Timestamp, corners: [(f64, f64); 4], value: f64) -> Self {
        Self {
            timestamp,
            corners,
            value,
        }
    }

    /// Corner at a labelled position.
    pub fn corner(&self, corner: Corner) -> (f64, f64) {
        self.corners[corner as usize]
    }

    /// Whether every corner is inside the geographic domain.
    pub fn has_valid_location(&self) -> bool {
        self.corners
            .iter()
            .all(|&(lon, lat)| valid_location(lon, lat))
    }
}

fn valid_location(lon: f64, lat: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
}
