//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.
//! Every projection implements [`Projector`], so the regridding engine can
//! work with any of them (or with [`Identity`] for pre-projected input).

pub mod error;
pub mod identity;
pub mod lambert;
pub mod params;
pub mod projector;

pub use error::{ProjectionError, ProjectionResult};
pub use identity::Identity;
pub use lambert::LambertConformal;
pub use params::{LambertParams, ProjectionParams};
pub use projector::{normalize_longitude, Projector};
