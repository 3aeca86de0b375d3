//! Common test fixtures for regridding tests.
//!
//! This module provides pre-defined grid geometries and vertical level sets
//! that represent common scenarios.

/// Common grid geometries for testing.
pub mod grid {
    /// Planar grid geometry, independent of the engine's grid type.
    #[derive(Debug, Clone, Copy)]
    pub struct GridGeometry {
        pub columns: usize,
        pub rows: usize,
        pub west_edge: f64,
        pub south_edge: f64,
        pub cell_width: f64,
        pub cell_height: f64,
    }

    /// 3x3 grid of 10-unit cells with origin (0, 0), used with the identity
    /// projection.
    pub const SMALL_3X3: GridGeometry = GridGeometry {
        columns: 3,
        rows: 3,
        west_edge: 0.0,
        south_edge: 0.0,
        cell_width: 10.0,
        cell_height: 10.0,
    };

    /// 10x10 grid of 1-unit cells with origin (0, 0).
    pub const UNIT_10X10: GridGeometry = GridGeometry {
        columns: 10,
        rows: 10,
        west_edge: 0.0,
        south_edge: 0.0,
        cell_width: 1.0,
        cell_height: 1.0,
    };

    /// CONUS 12 km Lambert grid (12US1).
    pub const CONUS_12KM: GridGeometry = GridGeometry {
        columns: 459,
        rows: 299,
        west_edge: -2556000.0,
        south_edge: -1728000.0,
        cell_width: 12000.0,
        cell_height: 12000.0,
    };
}

/// Vertical level definitions.
pub mod levels {
    /// Top-of-atmosphere pressure (Pa) for the sigma levels below.
    pub const TOP_PRESSURE: f64 = 10000.0;

    /// Sigma-pressure layer boundaries, surface (1.0) to top (0.0).
    pub const SIGMA_5: [f64; 6] = [1.0, 0.99, 0.95, 0.85, 0.5, 0.0];

    /// Height layer boundaries in meters.
    pub const HEIGHT_3: [f64; 4] = [0.0, 100.0, 1000.0, 10000.0];
}

/// Creates a temporary directory that is removed when dropped.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}
