//! Point observation binning.

use std::collections::BTreeMap;

use projection::Projector;
use regrid_common::{is_valid_value, Observation};

use crate::grid::Grid;
use crate::types::{AggregationMethod, BinningStats, CellKey, SparseEntry, SparseLayout, SparseTimestepResult};

/// Running sums for one cell.
#[derive(Debug, Default)]
struct PointCell {
    count: usize,
    weight: f64,
    sum: f64,
    sum2: f64,
    elevation_sum: f64,
    elevation_count: usize,
    note: Option<String>,
}

/// Assigns point observations to the grid cell containing them and reduces
/// each cell to the mean of its observations.
pub struct PointBinner<'a, P: Projector + ?Sized> {
    grid: &'a Grid,
    projector: &'a P,
}

impl<'a, P: Projector + ?Sized> PointBinner<'a, P> {
    pub fn new(grid: &'a Grid, projector: &'a P) -> Self {
        Self { grid, projector }
    }

    /// Bin `observations` (one timestep) and emit one entry per cell that
    /// received at least one valid observation.
    ///
    /// Observations outside the grid or with an invalid value are skipped and
    /// counted in the returned stats. An invalid value2 is treated as absent,
    /// which drops the value2 column for the timestep. On a layered grid, observations without
    /// an elevation are placed in layer 1. Entries are ordered by
    /// (layer, row, column) so the result does not depend on input order, and
    /// each entry's coordinates are the unprojected cell center.
    pub fn regrid<'o>(
        &self,
        method: AggregationMethod,
        minimum_valid_value: f64,
        observations: impl IntoIterator<Item = &'o Observation>,
    ) -> (SparseTimestepResult, BinningStats) {
        let mut cells: BTreeMap<CellKey, PointCell> = BTreeMap::new();
        let mut stats = BinningStats::default();
        let mut all_have_elevation = true;
        let mut all_have_value2 = true;
        let mut any_note = false;

        for observation in observations {
            if !observation.has_valid_location() {
                stats.out_of_bounds += 1;
                continue;
            }

            let (x, y) = self
                .projector
                .project(observation.longitude, observation.latitude);

            let Some((column, row)) = self.grid.column_row_of(x, y) else {
                stats.out_of_bounds += 1;
                continue;
            };

            let layer = if self.grid.is_layered() {
                match observation.elevation {
                    Some(elevation) => match self.grid.layer_of(elevation) {
                        Some(layer) => Some(layer),
                        None => {
                            stats.out_of_bounds += 1;
                            continue;
                        }
                    },
                    None => Some(1),
                }
            } else {
                None
            };

            let weight = match method {
                AggregationMethod::Mean => 1.0,
                AggregationMethod::Weighted => observation.effective_weight(),
            };

            if !is_valid_value(observation.value, minimum_valid_value)
                || !(weight.is_finite() && weight > 0.0)
            {
                stats.invalid_value += 1;
                continue;
            }

            // A missing second component drops only value2 for this record
            let value2 = observation
                .value2
                .filter(|&v| is_valid_value(v, f64::MIN));

            stats.accepted += 1;
            all_have_elevation &= observation.elevation.is_some();
            all_have_value2 &= value2.is_some();
            any_note |= observation.note.is_some();

            let cell = cells.entry(CellKey::new(column, row, layer)).or_default();
            cell.count += 1;
            cell.weight += weight;
            cell.sum += observation.value * weight;
            cell.sum2 += value2.unwrap_or(0.0) * weight;
            if let Some(elevation) = observation.elevation {
                cell.elevation_sum += elevation;
                cell.elevation_count += 1;
            }
            if let Some(note) = &observation.note {
                if cell.note.as_ref().map_or(true, |current| note < current) {
                    cell.note = Some(note.clone());
                }
            }
        }

        let layout = SparseLayout {
            layers: self.grid.is_layered(),
            elevations: self.grid.is_layered() || (stats.accepted > 0 && all_have_elevation),
            values2: stats.accepted > 0 && all_have_value2,
            notes: any_note,
        };

        let mut result = SparseTimestepResult::with_layout(layout, cells.len());

        for (key, cell) in cells {
            let (x, y) = self.grid.cell_center(key.column, key.row);
            let (longitude, latitude) = self.projector.unproject(x, y);

            let elevation = match key.layer {
                Some(layer) => self.grid.layer_center_elevation(layer),
                None if cell.elevation_count > 0 => {
                    Some(cell.elevation_sum / cell.elevation_count as f64)
                }
                None => None,
            };

            result.push(&SparseEntry {
                column: key.column,
                row: key.row,
                layer: key.layer,
                longitude,
                latitude,
                elevation,
                value: cell.sum / cell.weight,
                value2: layout.values2.then(|| cell.sum2 / cell.weight),
                count: cell.count,
                note: cell.note,
            });
        }

        tracing::debug!(
            accepted = stats.accepted,
            out_of_bounds = stats.out_of_bounds,
            invalid_value = stats.invalid_value,
            cells = result.len(),
            "Binned point observations"
        );

        (result, stats)
    }
}
