//! Test data generators for synthetic observations and footprints.
//!
//! These generators create predictable, verifiable inputs that can be used
//! across the test suite.

use regrid_common::{Footprint, Observation, RegridContext, Timestamp};

/// Default run start used by generated records.
pub const TEST_START: i64 = 20240101000000;

/// Timestamp `hour` hours after [`TEST_START`], plus `minute` minutes.
///
/// # Example
///
/// ```
/// use test_utils::hour_timestamp;
///
/// assert_eq!(hour_timestamp(0, 0).value(), 20240101000000);
/// assert_eq!(hour_timestamp(25, 30).value(), 20240102013000);
/// ```
pub fn hour_timestamp(hour: usize, minute: u32) -> Timestamp {
    let ctx = RegridContext::new(Timestamp::new(TEST_START), hour + 1)
        .expect("TEST_START is a valid timestamp");
    let base = ctx.step_start(hour, 1).value();
    Timestamp::new(base + minute as i64 * 100)
}

/// Creates observations at the given (lon, lat, value) triples, all stamped
/// with the same timestamp.
pub fn observations_at(timestamp: Timestamp, points: &[(f64, f64, f64)]) -> Vec<Observation> {
    points
        .iter()
        .map(|&(lon, lat, value)| Observation::new(timestamp, lon, lat, value))
        .collect()
}

/// Creates one observation per hour at a fixed location, with values taken
/// from `values` in order (hour 0 gets `values[0]`).
pub fn hourly_observations(lon: f64, lat: f64, values: &[f64]) -> Vec<Observation> {
    values
        .iter()
        .enumerate()
        .map(|(hour, &value)| Observation::new(hour_timestamp(hour, 0), lon, lat, value))
        .collect()
}

/// Creates an axis-aligned square footprint centered at (lon, lat).
///
/// Corners are stored in the SW, SE, NW, NE order footprints use.
pub fn square_footprint(
    timestamp: Timestamp,
    lon: f64,
    lat: f64,
    half_size: f64,
    value: f64,
) -> Footprint {
    Footprint::new(
        timestamp,
        [
            (lon - half_size, lat - half_size),
            (lon + half_size, lat - half_size),
            (lon - half_size, lat + half_size),
            (lon + half_size, lat + half_size),
        ],
        value,
    )
}

/// Returns a deterministic pseudo-random permutation of `items`.
///
/// Uses a Fisher-Yates shuffle driven by a simple hash so that tests are
/// reproducible without an RNG dependency.
pub fn shuffled<T: Clone>(items: &[T], seed: u32) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = simple_hash(i as u32, out.len() as u32, seed) as usize % (i + 1);
        out.swap(i, j);
    }
    out
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_observations() {
        let obs = hourly_observations(5.0, 5.0, &[1.0, 2.0, 3.0]);
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[2].timestamp.value(), 20240101020000);
        assert_eq!(obs[2].value, 3.0);
    }

    #[test]
    fn test_square_footprint_corner_order() {
        let fp = square_footprint(hour_timestamp(0, 0), 5.0, 5.0, 1.0, 2.0);
        assert_eq!(fp.corners[0], (4.0, 4.0));
        assert_eq!(fp.corners[1], (6.0, 4.0));
        assert_eq!(fp.corners[2], (4.0, 6.0));
        assert_eq!(fp.corners[3], (6.0, 6.0));
    }

    #[test]
    fn test_shuffled_is_permutation() {
        let items: Vec<u32> = (0..50).collect();
        let mut out = shuffled(&items, 7);
        assert_ne!(out, items);
        out.sort();
        assert_eq!(out, items);
        assert_eq!(shuffled(&items, 7), shuffled(&items, 7));
    }
}
