//! Serializable projection definitions.
//!
//! Grid definition files name a projection and its parameters; [`ProjectionParams::build`]
//! resolves that description into a concrete [`Projector`].

use serde::{Deserialize, Serialize};

use crate::error::ProjectionResult;
use crate::identity::Identity;
use crate::lambert::LambertConformal;
use crate::projector::Projector;

/// Lambert Conformal Conic parameters, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LambertParams {
    /// Lower standard parallel
    pub lower_parallel: f64,
    /// Upper standard parallel
    pub upper_parallel: f64,
    /// Latitude of the projection origin
    pub origin_latitude: f64,
    /// Longitude of the projection origin (central meridian)
    pub central_longitude: f64,
    /// Ellipsoid semi-major axis in meters
    pub major_semiaxis: f64,
    /// Ellipsoid semi-minor axis in meters
    pub minor_semiaxis: f64,
}

impl LambertParams {
    /// CONUS modeling domain parameters on a 6370 km sphere.
    pub fn conus() -> Self {
        Self {
            lower_parallel: 33.0,
            upper_parallel: 45.0,
            origin_latitude: 40.0,
            central_longitude: -97.0,
            major_semiaxis: 6370000.0,
            minor_semiaxis: 6370000.0,
        }
    }
}

/// Projection selected by a grid definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProjectionParams {
    /// Lambert Conformal Conic
    Lambert(LambertParams),
    /// Input coordinates are already planar (or a plain lon/lat grid)
    Identity,
}

impl ProjectionParams {
    /// Build the projector described by these parameters.
    pub fn build(&self) -> ProjectionResult<Box<dyn Projector>> {
        match self {
            Self::Lambert(params) => Ok(Box::new(LambertConformal::new(params)?)),
            Self::Identity => Ok(Box::new(Identity)),
        }
    }

    /// Projection name as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lambert(_) => "lambert",
            Self::Identity => "identity",
        }
    }
}
