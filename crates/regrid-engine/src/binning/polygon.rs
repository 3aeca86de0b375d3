//! Footprint (quadrilateral) binning.
//!
//! Each footprint is projected, reordered into a simple counter-clockwise
//! quad and spread over the grid cells it overlaps:
//!
//! - [`AggregationMethod::Mean`]: every cell whose center lies inside the quad
//!   counts the footprint once. A quad too small to contain any cell center is
//!   given to the cell containing its area centroid.
//! - [`AggregationMethod::Weighted`]: every overlapped cell receives the
//!   footprint with weight `area(quad ∩ cell) / area(quad)`.
//!
//! Accumulation persists across calls until [`FootprintAccumulator::finish`].

use projection::Projector;
use regrid_common::{is_valid_value, Footprint};

use crate::aggregate::DenseAccumulator;
use crate::error::Result;
use crate::grid::Grid;
use crate::types::{AggregationMethod, BinningStats, CellKey, SparseTimestepResult};

use super::geometry::{Quad, Rect};

/// Overlap fractions below this are treated as edge contact, not overlap.
const MIN_OVERLAP_FRACTION: f64 = 1e-9;

pub struct FootprintAccumulator<'a, P: Projector + ?Sized> {
    grid: &'a Grid,
    projector: &'a P,
    method: AggregationMethod,
    minimum_valid_value: f64,
    cells: DenseAccumulator,
    stats: BinningStats,
}

impl<'a, P: Projector + ?Sized> FootprintAccumulator<'a, P> {
    /// Allocate a dense accumulator covering every cell of `grid`.
    pub fn new(
        grid: &'a Grid,
        projector: &'a P,
        method: AggregationMethod,
        minimum_valid_value: f64,
    ) -> Result<Self> {
        Ok(Self {
            grid,
            projector,
            method,
            minimum_valid_value,
            cells: DenseAccumulator::new(grid.cell_count(), method.is_weighted())?,
            stats: BinningStats::default(),
        })
    }

    /// Accumulate `footprints` and return the stats for this batch.
    pub fn regrid_footprints<'f>(
        &mut self,
        footprints: impl IntoIterator<Item = &'f Footprint>,
    ) -> BinningStats {
        let mut batch = BinningStats::default();

        for footprint in footprints {
            if !footprint.has_valid_location() {
                batch.out_of_bounds += 1;
                continue;
            }

            let corners = footprint
                .corners
                .map(|(lon, lat)| self.projector.project(lon, lat));
            let quad = match Quad::from_corners(corners) {
                Ok(quad) => quad,
                Err(e) => {
                    tracing::trace!(timestamp = %footprint.timestamp, error = %e, "Skipping footprint");
                    batch.invalid_geometry += 1;
                    continue;
                }
            };

            if !is_valid_value(footprint.value, self.minimum_valid_value) {
                batch.invalid_value += 1;
                continue;
            }

            let hit = match self.method {
                AggregationMethod::Mean => self.bin_by_center(&quad, footprint.value),
                AggregationMethod::Weighted => self.bin_by_area(&quad, footprint.value),
            };

            if hit {
                batch.accepted += 1;
            } else {
                batch.out_of_bounds += 1;
            }
        }

        self.stats += batch;
        batch
    }

    /// Stats accumulated since the last [`finish`](Self::finish).
    pub fn stats(&self) -> BinningStats {
        self.stats
    }

    /// Cells that have received data so far.
    pub fn active_cells(&self) -> usize {
        self.cells.active_cells()
    }

    /// Finalise the period: compute cell means, compact to a sparse result and
    /// reset the accumulator for the next period.
    pub fn finish(&mut self) -> Result<(SparseTimestepResult, BinningStats)> {
        let result = self
            .cells
            .finish(self.grid, self.projector, self.minimum_valid_value)?;
        let stats = std::mem::take(&mut self.stats);

        tracing::debug!(
            accepted = stats.accepted,
            out_of_bounds = stats.out_of_bounds,
            invalid_value = stats.invalid_value,
            invalid_geometry = stats.invalid_geometry,
            cells = result.len(),
            "Finished footprint period"
        );

        Ok((result, stats))
    }

    fn flat_index(&self, column: usize, row: usize) -> usize {
        // Footprints carry no elevation: layered grids receive them in layer 1
        let layer = self.grid.is_layered().then_some(1);
        self.grid.flat_index(CellKey::new(column, row, layer))
    }

    fn bin_by_center(&mut self, quad: &Quad, value: f64) -> bool {
        let (x_min, y_min, x_max, y_max) = quad.bounds();
        let mut hit = false;

        if let Some((columns, rows)) = self.grid.cell_range(x_min, y_min, x_max, y_max) {
            for row in rows {
                for column in columns.clone() {
                    if quad.contains(self.grid.cell_center(column, row)) {
                        let index = self.flat_index(column, row);
                        self.cells.accumulate(index, value, 1.0);
                        hit = true;
                    }
                }
            }
        }

        if !hit {
            let (cx, cy) = quad.centroid();
            if let Some((column, row)) = self.grid.column_row_of(cx, cy) {
                let index = self.flat_index(column, row);
                self.cells.accumulate(index, value, 1.0);
                hit = true;
            }
        }

        hit
    }

    fn bin_by_area(&mut self, quad: &Quad, value: f64) -> bool {
        let (x_min, y_min, x_max, y_max) = quad.bounds();
        let Some((columns, rows)) = self.grid.cell_range(x_min, y_min, x_max, y_max) else {
            return false;
        };

        let mut hit = false;
        for row in rows {
            for column in columns.clone() {
                let (cx_min, cy_min, cx_max, cy_max) = self.grid.cell_bounds(column, row);
                let overlap = quad.clipped_area(&Rect::new(cx_min, cy_min, cx_max, cy_max));
                let weight = overlap / quad.area();
                if weight > MIN_OVERLAP_FRACTION {
                    let index = self.flat_index(column, row);
                    self.cells.accumulate(index, value, weight);
                    hit = true;
                }
            }
        }
        hit
    }
}
