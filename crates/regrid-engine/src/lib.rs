//! Regridding and temporal aggregation of geolocated observations.
//!
//! Point observations and four-corner swath footprints are projected onto a
//! fixed map-projected grid, binned into cells, reduced to per-cell means and
//! compacted to sparse per-timestep results. Consecutive hourly timesteps can
//! then be merged into coarser periods (e.g. daily).
//!
//! # Architecture
//!
//! ```text
//! Observation / Footprint
//!      │
//!      ▼
//! Projector::project ──► Grid::column_row_of / layer_of
//!      │
//!      ├─► PointBinner::regrid (per hour, ordered cell map ──► sparse)
//!      │        │
//!      │        ▼
//!      │   aggregate (hours_per_period) ──────────────┐
//!      │                                              │
//!      └─► FootprintAccumulator (every hour of one    │
//!          output period into one set of buffers)     │
//!               │                                     │
//!               ▼                                     ▼
//!          compute_cell_means + compact_cells ──► AggregatedSeries ──► SeriesWriter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use projection::LambertConformal;
//! use regrid_common::{RegridContext, Timestamp};
//! use regrid_engine::{Grid, RegridConfig, Regridder};
//!
//! let grid = Grid::new(definition)?;
//! let regridder = Regridder::new(grid, LambertConformal::conus(), RegridConfig::default())?;
//! let ctx = RegridContext::new(Timestamp::new(20240101000000), 24)?;
//!
//! let series = regridder.regrid_points(&ctx, &observations)?.require_data()?;
//! ```

pub mod aggregate;
pub mod binning;
pub mod codec;
pub mod config;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod spill;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use aggregate::{aggregate, aggregate_flat, compact_cells, compute_cell_means, DenseAccumulator};
pub use binning::{FootprintAccumulator, PointBinner, Quad};
pub use config::RegridConfig;
pub use error::{RegridError, Result};
pub use grid::{Grid, GridDefinition, VerticalCoordinate};
pub use pipeline::{partition_by_hour, RegridOutcome, Regridder};
pub use spill::{SpillReader, SpillWriter};
pub use types::{
    AggregatedSeries, AggregationMethod, BinningStats, CellKey, FlatSeries, SparseEntry,
    SparseLayout, SparseTimestepResult, TemporalSummary,
};
pub use writer::{AsciiWriter, OutputFormat, SeriesWriter, VariableInfo, XdrWriter};
