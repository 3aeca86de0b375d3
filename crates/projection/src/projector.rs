//! The projection capability shared by all map projections.

/// Forward and inverse mapping between geographic coordinates (degrees) and
/// planar projection coordinates (typically meters).
///
/// Implementations must be pure: the same input always yields the same output
/// and `unproject(project(lon, lat))` returns `(lon, lat)` within a small
/// epsilon for every point in the projection's valid domain.
///
/// Longitude outside [-180, 180] or latitude outside [-90, 90] is a
/// precondition violation; callers filter such records first.
pub trait Projector: Send + Sync {
    /// Convert geographic (lon, lat) in degrees to planar (x, y).
    fn project(&self, lon: f64, lat: f64) -> (f64, f64);

    /// Convert planar (x, y) back to geographic (lon, lat) in degrees.
    fn unproject(&self, x: f64, y: f64) -> (f64, f64);

    /// Short identifier used in logs and output headers.
    fn name(&self) -> &'static str;
}

impl<P: Projector + ?Sized> Projector for Box<P> {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (**self).project(lon, lat)
    }

    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        (**self).unproject(x, y)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<P: Projector + ?Sized> Projector for &P {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (**self).project(lon, lat)
    }

    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        (**self).unproject(x, y)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Wrap a longitude in degrees into [-180, 180]. Values already in range are
/// returned unchanged, values east of 180 wrap into (-180, 180] and
/// non-finite input yields NaN.
pub fn normalize_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 180.0 {
        180.0
    } else {
        wrapped
    }
}
