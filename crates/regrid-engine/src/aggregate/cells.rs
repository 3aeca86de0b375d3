//! Dense per-cell accumulation, cell means and compaction to sparse output.

use projection::Projector;
use regrid_common::is_valid_value;

use crate::error::{RegridError, Result};
use crate::grid::Grid;
use crate::types::{SparseEntry, SparseLayout, SparseTimestepResult};

/// Dense rows x columns (x layers) accumulator buffers for one aggregation
/// period.
#[derive(Debug, Clone)]
pub struct DenseAccumulator {
    counts: Vec<usize>,
    weights: Option<Vec<f64>>,
    data: Vec<f64>,
}

impl DenseAccumulator {
    /// Allocate zeroed buffers for `cells` cells. A weight buffer is carried
    /// only when `weighted` is set.
    pub fn new(cells: usize, weighted: bool) -> Result<Self> {
        Ok(Self {
            counts: zeroed(cells)?,
            weights: if weighted { Some(zeroed(cells)?) } else { None },
            data: zeroed(cells)?,
        })
    }

    /// Add one contribution to the cell at `index`.
    ///
    /// In weighted mode the value is scaled by `weight` and the weight is
    /// summed; otherwise `weight` is ignored.
    pub fn accumulate(&mut self, index: usize, value: f64, weight: f64) {
        self.counts[index] += 1;
        match self.weights.as_mut() {
            Some(weights) => {
                weights[index] += weight;
                self.data[index] += value * weight;
            }
            None => self.data[index] += value,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.counts.len()
    }

    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Cells with at least one contribution.
    pub fn active_cells(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Zero every buffer so the accumulator can be reused for the next period.
    pub fn reset(&mut self) {
        self.counts.fill(0);
        if let Some(weights) = self.weights.as_mut() {
            weights.fill(0.0);
        }
        self.data.fill(0.0);
    }

    /// Reduce to cell means and compact into a sparse result, then reset.
    pub fn finish<P: Projector + ?Sized>(
        &mut self,
        grid: &Grid,
        projector: &P,
        minimum_valid_value: f64,
    ) -> Result<SparseTimestepResult> {
        compute_cell_means(
            minimum_valid_value,
            &mut self.counts,
            self.weights.as_deref(),
            &mut self.data,
        )?;
        let result = compact_cells(grid, projector, &self.counts, &self.data)?;
        self.reset();
        Ok(result)
    }
}

fn zeroed<T: Clone + Default>(cells: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(cells)
        .map_err(|_| RegridError::Allocation { cells })?;
    buffer.resize(cells, T::default());
    Ok(buffer)
}

/// Turn accumulated sums into means in place and return the number of active
/// cells.
///
/// Each cell with `counts[cell] > 0` becomes `data[cell] / weights[cell]` (or
/// `/ counts[cell]` without weights). A cell whose weight is not positive or
/// whose mean is not a valid value is deactivated: its count and data are
/// reset to zero so it is left out of compaction.
pub fn compute_cell_means(
    minimum_valid_value: f64,
    counts: &mut [usize],
    weights: Option<&[f64]>,
    data: &mut [f64],
) -> Result<usize> {
    if counts.len() != data.len() || weights.map_or(false, |w| w.len() != data.len()) {
        return Err(RegridError::invalid_input(format!(
            "cell buffers differ in length: counts {}, weights {:?}, data {}",
            counts.len(),
            weights.map(<[f64]>::len),
            data.len()
        )));
    }

    let mut active = 0;
    for cell in 0..counts.len() {
        if counts[cell] == 0 {
            continue;
        }

        let denominator = match weights {
            Some(weights) => weights[cell],
            None => counts[cell] as f64,
        };

        let mean = data[cell] / denominator;
        if denominator > 0.0 && is_valid_value(mean, minimum_valid_value) {
            data[cell] = mean;
            active += 1;
        } else {
            counts[cell] = 0;
            data[cell] = 0.0;
        }
    }

    Ok(active)
}

/// Emit every cell with `counts[cell] > 0` as a sparse entry, scanning in
/// row-major (layer, row, column) order. `data` must already hold means.
///
/// Coordinates are the unprojected cell center; layered grids also carry the
/// layer and its center elevation.
pub fn compact_cells<P: Projector + ?Sized>(
    grid: &Grid,
    projector: &P,
    counts: &[usize],
    data: &[f64],
) -> Result<SparseTimestepResult> {
    if counts.len() != grid.cell_count() || data.len() != grid.cell_count() {
        return Err(RegridError::invalid_input(format!(
            "cell buffers hold {} counts and {} values, grid has {} cells",
            counts.len(),
            data.len(),
            grid.cell_count()
        )));
    }

    let active = counts.iter().filter(|&&c| c > 0).count();
    let layout = SparseLayout {
        layers: grid.is_layered(),
        elevations: grid.is_layered(),
        ..Default::default()
    };
    let mut result = SparseTimestepResult::with_layout(layout, active);

    for (index, (&count, &value)) in counts.iter().zip(data).enumerate() {
        if count == 0 {
            continue;
        }
        let key = grid.key_of(index);
        let (x, y) = grid.cell_center(key.column, key.row);
        let (longitude, latitude) = projector.unproject(x, y);

        result.push(&SparseEntry {
            column: key.column,
            row: key.row,
            layer: key.layer,
            longitude,
            latitude,
            elevation: key.layer.and_then(|layer| grid.layer_center_elevation(layer)),
            value,
            value2: None,
            count,
            note: None,
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridDefinition, VerticalCoordinate};
    use crate::types::CellKey;
    use projection::Identity;
    use test_utils::{assert_approx_eq, fixtures};

    fn small_grid(vertical: Option<VerticalCoordinate>) -> Grid {
        let g = fixtures::grid::SMALL_3X3;
        Grid::new(GridDefinition {
            columns: g.columns,
            rows: g.rows,
            west_edge: g.west_edge,
            south_edge: g.south_edge,
            cell_width: g.cell_width,
            cell_height: g.cell_height,
            vertical,
        })
        .unwrap()
    }

    #[test]
    fn test_compute_cell_means_counts() {
        let mut counts = vec![0, 2, 4];
        let mut data = vec![0.0, 6.0, 10.0];
        let active = compute_cell_means(0.0, &mut counts, None, &mut data).unwrap();
        assert_eq!(active, 2);
        assert_eq!(data, vec![0.0, 3.0, 2.5]);
    }

    #[test]
    fn test_compute_cell_means_weights() {
        let mut counts = vec![3, 1];
        let weights = vec![1.5, 0.0];
        let mut data = vec![6.0, 2.0];
        let active = compute_cell_means(0.0, &mut counts, Some(&weights), &mut data).unwrap();
        assert_eq!(active, 1);
        assert_approx_eq!(data[0], 4.0, 1e-12);
        // Zero weight deactivates the cell instead of dividing by zero
        assert_eq!(counts[1], 0);
        assert_eq!(data[1], 0.0);
    }

    #[test]
    fn test_compute_cell_means_rejects_means_below_minimum() {
        let mut counts = vec![1, 1];
        let mut data = vec![-5.0, 5.0];
        let active = compute_cell_means(0.0, &mut counts, None, &mut data).unwrap();
        assert_eq!(active, 1);
        assert_eq!(counts, vec![0, 1]);
    }

    #[test]
    fn test_compute_cell_means_length_mismatch() {
        let mut counts = vec![1, 1];
        let mut data = vec![1.0];
        assert!(compute_cell_means(0.0, &mut counts, None, &mut data).is_err());
    }

    #[test]
    fn test_compact_cells_row_major() {
        let grid = small_grid(None);
        let mut counts = vec![0; 9];
        let mut data = vec![0.0; 9];
        // (3, 1) and (1, 2)
        counts[grid.flat_index(CellKey::new(1, 2, None))] = 2;
        data[grid.flat_index(CellKey::new(1, 2, None))] = 7.0;
        counts[grid.flat_index(CellKey::new(3, 1, None))] = 1;
        data[grid.flat_index(CellKey::new(3, 1, None))] = 4.0;

        let result = compact_cells(&grid, &Identity, &counts, &data).unwrap();

        assert_eq!(result.columns, vec![3, 1]);
        assert_eq!(result.rows, vec![1, 2]);
        assert_eq!(result.values, vec![4.0, 7.0]);
        assert_eq!(result.counts, vec![1, 2]);
        assert_eq!(result.longitudes, vec![25.0, 5.0]);
        assert_eq!(result.latitudes, vec![5.0, 15.0]);
        assert!(result.layers.is_none());
    }

    #[test]
    fn test_compact_cells_layered() {
        let grid = small_grid(Some(VerticalCoordinate::Height {
            levels: fixtures::levels::HEIGHT_3.to_vec(),
        }));
        let mut counts = vec![0; grid.cell_count()];
        let data = vec![1.0; grid.cell_count()];
        counts[grid.flat_index(CellKey::new(2, 2, Some(3)))] = 1;

        let result = compact_cells(&grid, &Identity, &counts, &data).unwrap();

        assert_eq!(result.layers, Some(vec![3]));
        assert_eq!(result.elevations, Some(vec![5500.0]));
    }

    #[test]
    fn test_compact_cells_rejects_wrong_size() {
        let grid = small_grid(None);
        assert!(compact_cells(&grid, &Identity, &[0; 4], &[0.0; 4]).is_err());
    }

    #[test]
    fn test_dense_accumulator_finish_resets() {
        let grid = small_grid(None);
        let mut acc = DenseAccumulator::new(grid.cell_count(), true).unwrap();
        let index = grid.flat_index(CellKey::new(2, 3, None));
        acc.accumulate(index, 10.0, 0.25);
        acc.accumulate(index, 20.0, 0.75);
        assert_eq!(acc.active_cells(), 1);

        let result = acc.finish(&grid, &Identity, 0.0).unwrap();
        assert_eq!(result.len(), 1);
        assert_approx_eq!(result.values[0], 17.5, 1e-12);
        assert_eq!(result.counts[0], 2);

        assert_eq!(acc.active_cells(), 0);
        assert!(acc.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_dense_accumulator_unweighted_ignores_weight() {
        let mut acc = DenseAccumulator::new(4, false).unwrap();
        acc.accumulate(1, 3.0, 0.1);
        assert_eq!(acc.data()[1], 3.0);
        assert!(acc.weights().is_none());
    }

    #[test]
    fn test_dense_accumulator_allocation_failure() {
        let err = DenseAccumulator::new(usize::MAX, false).unwrap_err();
        assert!(matches!(err, RegridError::Allocation { .. }));
    }
}
