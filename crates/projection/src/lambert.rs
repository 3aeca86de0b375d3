//! Lambert Conformal Conic projection.
//!
//! This projection is commonly used for air quality and weather model grids
//! (CMAQ, WRF, HRRR). It maps a cone secant (or tangent) to the Earth's
//! surface onto a flat plane.
//!
//! The projection parameters include:
//! - Standard parallels: lower and upper latitude where the cone cuts the
//!   ellipsoid (equal for a tangent cone)
//! - Origin latitude: latitude of the projection origin (y = 0)
//! - Central longitude: meridian of the projection origin (x = 0)
//! - Semi-major and semi-minor axes of the ellipsoid (equal for a sphere)
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual" (USGS 1395),
//! equations 15-1 through 15-11. With equal axes the eccentricity is zero and
//! they reduce exactly to the spherical form.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::error::{ProjectionError, ProjectionResult};
use crate::params::LambertParams;
use crate::projector::{normalize_longitude, Projector};

/// Tolerance for treating two parallels as equal (radians).
const PARALLEL_TOLERANCE: f64 = 1e-10;

/// Convergence tolerance for the inverse latitude iteration (radians).
const LATITUDE_TOLERANCE: f64 = 1e-12;

/// Maximum iterations for the inverse latitude.
const MAX_ITERATIONS: usize = 15;

/// Lambert Conformal Conic projection.
///
/// Planar coordinates are meters from the origin at
/// (central longitude, origin latitude).
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Origin latitude in radians
    pub lat0: f64,
    /// Lower standard parallel in radians
    pub latin1: f64,
    /// Upper standard parallel in radians
    pub latin2: f64,
    /// Semi-major axis (meters)
    pub major_semiaxis: f64,
    /// Semi-minor axis (meters)
    pub minor_semiaxis: f64,
    /// First eccentricity
    e: f64,
    /// Cone constant (n)
    n: f64,
    /// Scaled F constant (a * F)
    af: f64,
    /// Rho at the origin latitude
    rho0: f64,
}

impl LambertConformal {
    /// Create a new Lambert Conformal projection from its parameters.
    ///
    /// Fails when the parameters cannot define a cone: non-positive axes,
    /// minor axis larger than major axis, a standard parallel at a pole, or
    /// standard parallels symmetric about the equator.
    pub fn new(params: &LambertParams) -> ProjectionResult<Self> {
        let LambertParams {
            lower_parallel,
            upper_parallel,
            origin_latitude,
            central_longitude,
            major_semiaxis,
            minor_semiaxis,
        } = *params;

        if !(major_semiaxis > 0.0 && minor_semiaxis > 0.0) {
            return Err(ProjectionError::invalid(format!(
                "semi-axes must be positive, got {} and {}",
                major_semiaxis, minor_semiaxis
            )));
        }
        if minor_semiaxis > major_semiaxis {
            return Err(ProjectionError::invalid(format!(
                "minor semi-axis {} exceeds major semi-axis {}",
                minor_semiaxis, major_semiaxis
            )));
        }
        for (name, value) in [
            ("lower_parallel", lower_parallel),
            ("upper_parallel", upper_parallel),
        ] {
            if !(value.abs() < 90.0) {
                return Err(ProjectionError::invalid(format!(
                    "{} must lie strictly between -90 and 90, got {}",
                    name, value
                )));
            }
        }
        if !(origin_latitude.abs() < 90.0) {
            return Err(ProjectionError::invalid(format!(
                "origin_latitude must lie strictly between -90 and 90, got {}",
                origin_latitude
            )));
        }
        if !(-180.0..=180.0).contains(&central_longitude) {
            return Err(ProjectionError::invalid(format!(
                "central_longitude must lie in [-180, 180], got {}",
                central_longitude
            )));
        }

        let latin1 = lower_parallel.to_radians();
        let latin2 = upper_parallel.to_radians();
        let lat0 = origin_latitude.to_radians();
        let lon0 = central_longitude.to_radians();

        let e = (1.0 - (minor_semiaxis * minor_semiaxis) / (major_semiaxis * major_semiaxis)).sqrt();

        let m1 = msfn(latin1, e);
        let m2 = msfn(latin2, e);
        let t1 = tsfn(latin1, e);
        let t2 = tsfn(latin2, e);

        // Compute cone constant n
        let n = if (latin1 - latin2).abs() < PARALLEL_TOLERANCE {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };

        if !n.is_finite() || n.abs() < PARALLEL_TOLERANCE {
            return Err(ProjectionError::invalid(format!(
                "standard parallels {} and {} do not define a cone",
                lower_parallel, upper_parallel
            )));
        }

        let af = major_semiaxis * m1 / (n * t1.powf(n));
        let rho0 = af * tsfn(lat0, e).powf(n);

        Ok(Self {
            lon0,
            lat0,
            latin1,
            latin2,
            major_semiaxis,
            minor_semiaxis,
            e,
            n,
            af,
            rho0,
        })
    }

    /// Create the CONUS air-quality modeling projection (spherical earth,
    /// parallels 33/45, origin 40N 97W).
    pub fn conus() -> Self {
        Self::new(&LambertParams::conus()).expect("CONUS parameters are valid")
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Inverse latitude from the isometric t value (Snyder 7-9, iterated).
    fn latitude_from_t(&self, t: f64) -> f64 {
        let half_e = self.e * 0.5;
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();

        if self.e == 0.0 {
            return phi;
        }

        for _ in 0..MAX_ITERATIONS {
            let es = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(half_e)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < LATITUDE_TOLERANCE {
                break;
            }
        }

        phi
    }
}

impl Projector for LambertConformal {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lat = lat.to_radians();

        // Normalize longitude difference to [-180, 180]
        let dlon = normalize_longitude(lon - self.lon0.to_degrees()).to_radians();

        // Compute rho for this latitude
        let rho = self.af * tsfn(lat, self.e).powf(self.n);

        // Compute theta (angle from central meridian)
        let theta = self.n * dlon;

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();

        (x, y)
    }

    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let sign = self.n.signum();
        let dy = self.rho0 - y;

        // Compute rho and theta from x, y
        let rho = sign * (x * x + dy * dy).sqrt();

        if rho == 0.0 {
            // Apex of the cone
            return (self.lon0.to_degrees(), sign * 90.0);
        }

        let theta = (sign * x).atan2(sign * dy);

        let t = (rho / self.af).powf(1.0 / self.n);
        let lat = self.latitude_from_t(t);
        let lon = self.lon0 + theta / self.n;

        (normalize_longitude(lon.to_degrees()), lat.to_degrees())
    }

    fn name(&self) -> &'static str {
        "lambert"
    }
}

/// Snyder's m: cos(phi) / sqrt(1 - e^2 sin^2(phi)).
fn msfn(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

/// Snyder's t: tan(pi/4 - phi/2) / ((1 - e sin(phi)) / (1 + e sin(phi)))^(e/2).
fn tsfn(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi * 0.5).tan() / ((1.0 - es) / (1.0 + es)).powf(e * 0.5)
}
