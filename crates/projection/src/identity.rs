//! Pass-through projection for input that is already in grid coordinates.

use crate::projector::Projector;

/// Identity projection: `x = lon`, `y = lat`.
///
/// Used for pre-projected observations and for plain lon/lat grids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl Projector for Identity {
    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon, lat)
    }

    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passes_coordinates_through() {
        let p = Identity;
        assert_eq!(p.project(-97.5, 38.25), (-97.5, 38.25));
        assert_eq!(p.unproject(25.0, 5.0), (25.0, 5.0));
    }
}
