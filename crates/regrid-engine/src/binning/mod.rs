//! Assigning observations and footprints to grid cells.

pub mod geometry;
mod point;
mod polygon;

pub use geometry::{Point, Quad, Rect};
pub use point::PointBinner;
pub use polygon::FootprintAccumulator;
