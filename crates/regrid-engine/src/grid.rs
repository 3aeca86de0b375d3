//! Grid cell geometry and coordinate to cell-index mapping.
//!
//! Cells are addressed with 1-based (column, row[, layer]) indices. Column 1
//! starts at the west edge, row 1 at the south edge and layer 1 at the
//! surface.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{RegridError, Result};
use crate::types::CellKey;

/// Sea-level standard pressure (Pa).
const SURFACE_PRESSURE: f64 = 101325.0;

/// Standard atmosphere lapse coefficient (1/m) and exponent.
const PRESSURE_LAPSE: f64 = 2.25577e-5;
const PRESSURE_EXPONENT: f64 = 5.25588;

/// Vertical coordinate of a layered grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VerticalCoordinate {
    /// Sigma-pressure boundaries (1 at the surface, 0 at `top_pressure`).
    Sigma { top_pressure: f64, levels: Vec<f64> },
    /// Height boundaries in meters above mean sea level.
    Height { levels: Vec<f64> },
}

impl VerticalCoordinate {
    pub fn levels(&self) -> &[f64] {
        match self {
            Self::Sigma { levels, .. } | Self::Height { levels } => levels,
        }
    }

    /// Convert an elevation (meters above MSL) to this coordinate.
    pub fn from_elevation(&self, elevation: f64) -> f64 {
        match self {
            Self::Sigma { top_pressure, .. } => {
                let pressure =
                    SURFACE_PRESSURE * (1.0 - PRESSURE_LAPSE * elevation).powf(PRESSURE_EXPONENT);
                (pressure - top_pressure) / (SURFACE_PRESSURE - top_pressure)
            }
            Self::Height { .. } => elevation,
        }
    }

    /// Convert a coordinate value back to elevation (meters above MSL).
    pub fn to_elevation(&self, coordinate: f64) -> f64 {
        match self {
            Self::Sigma { top_pressure, .. } => {
                let pressure = coordinate * (SURFACE_PRESSURE - top_pressure) + top_pressure;
                (1.0 - (pressure / SURFACE_PRESSURE).powf(1.0 / PRESSURE_EXPONENT))
                    / PRESSURE_LAPSE
            }
            Self::Height { .. } => coordinate,
        }
    }
}

/// Grid geometry as read from a grid definition file. Coordinates are in the
/// units of the grid's projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub columns: usize,
    pub rows: usize,
    pub west_edge: f64,
    pub south_edge: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalCoordinate>,
}

/// A validated grid.
#[derive(Debug, Clone)]
pub struct Grid {
    definition: GridDefinition,
    layers: usize,
}

impl Grid {
    /// Validate a definition and build the grid.
    pub fn new(definition: GridDefinition) -> Result<Self> {
        let GridDefinition {
            columns,
            rows,
            west_edge,
            south_edge,
            cell_width,
            cell_height,
            ref vertical,
        } = definition;

        if columns == 0 || rows == 0 {
            return Err(RegridError::invalid_grid(format!(
                "columns and rows must be >= 1, got {} x {}",
                columns, rows
            )));
        }
        if !(cell_width > 0.0 && cell_height > 0.0) {
            return Err(RegridError::invalid_grid(format!(
                "cell width and height must be > 0, got {} x {}",
                cell_width, cell_height
            )));
        }
        if !west_edge.is_finite() || !south_edge.is_finite() {
            return Err(RegridError::invalid_grid("grid edges must be finite"));
        }

        let layers = match vertical {
            None => 1,
            Some(vertical) => {
                validate_vertical(vertical)?;
                vertical.levels().len() - 1
            }
        };

        columns
            .checked_mul(rows)
            .and_then(|n| n.checked_mul(layers))
            .ok_or_else(|| RegridError::invalid_grid("grid cell count overflows"))?;

        Ok(Self { definition, layers })
    }

    pub fn definition(&self) -> &GridDefinition {
        &self.definition
    }

    pub fn columns(&self) -> usize {
        self.definition.columns
    }

    pub fn rows(&self) -> usize {
        self.definition.rows
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Whether cells carry a layer index.
    pub fn is_layered(&self) -> bool {
        self.definition.vertical.is_some()
    }

    pub fn cell_width(&self) -> f64 {
        self.definition.cell_width
    }

    pub fn cell_height(&self) -> f64 {
        self.definition.cell_height
    }

    /// Total cells including layers.
    pub fn cell_count(&self) -> usize {
        self.columns() * self.rows() * self.layers
    }

    /// Cells in one layer.
    pub fn horizontal_cell_count(&self) -> usize {
        self.columns() * self.rows()
    }

    /// 1-based (column, row) containing planar point (x, y), or `None` when the
    /// point is outside the grid.
    pub fn column_row_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let column = self.column_index(x)?;
        let row = self.row_index(y)?;
        if column >= 1 && column <= self.columns() as i64 && row >= 1 && row <= self.rows() as i64 {
            Some((column as usize, row as usize))
        } else {
            None
        }
    }

    /// Unclamped 1-based column index of `x`.
    fn column_index(&self, x: f64) -> Option<i64> {
        let index = ((x - self.definition.west_edge) / self.definition.cell_width).floor();
        index.is_finite().then(|| index as i64 + 1)
    }

    /// Unclamped 1-based row index of `y`.
    fn row_index(&self, y: f64) -> Option<i64> {
        let index = ((y - self.definition.south_edge) / self.definition.cell_height).floor();
        index.is_finite().then(|| index as i64 + 1)
    }

    /// 1-based layer containing `elevation` (meters above MSL), or `None` when
    /// the grid has no layers or the elevation is outside them.
    ///
    /// A value on a shared boundary belongs to the first containing interval
    /// in boundary array order. For the usual surface-first arrays (sigma
    /// decreasing from 1, heights increasing from 0) that is the layer nearer
    /// the surface.
    pub fn layer_of(&self, elevation: f64) -> Option<usize> {
        let vertical = self.definition.vertical.as_ref()?;
        let coordinate = vertical.from_elevation(elevation);
        if !coordinate.is_finite() {
            return None;
        }
        vertical
            .levels()
            .windows(2)
            .position(|pair| {
                let (lo, hi) = if pair[0] <= pair[1] {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                coordinate >= lo && coordinate <= hi
            })
            .map(|index| index + 1)
    }

    /// Elevation (meters above MSL) at the vertical midpoint of `layer`.
    pub fn layer_center_elevation(&self, layer: usize) -> Option<f64> {
        let vertical = self.definition.vertical.as_ref()?;
        let levels = vertical.levels();
        if layer == 0 || layer >= levels.len() {
            return None;
        }
        let mid = 0.5 * (levels[layer - 1] + levels[layer]);
        Some(vertical.to_elevation(mid))
    }

    /// Planar coordinates of the center of a cell.
    pub fn cell_center(&self, column: usize, row: usize) -> (f64, f64) {
        let d = &self.definition;
        (
            d.west_edge + (column as f64 - 0.5) * d.cell_width,
            d.south_edge + (row as f64 - 0.5) * d.cell_height,
        )
    }

    /// Planar bounds (x_min, y_min, x_max, y_max) of a cell.
    pub fn cell_bounds(&self, column: usize, row: usize) -> (f64, f64, f64, f64) {
        let d = &self.definition;
        let x_min = d.west_edge + (column - 1) as f64 * d.cell_width;
        let y_min = d.south_edge + (row - 1) as f64 * d.cell_height;
        (x_min, y_min, x_min + d.cell_width, y_min + d.cell_height)
    }

    /// Column and row ranges of the cells overlapping a planar bounding box,
    /// clamped to the grid. `None` when the box misses the grid entirely.
    pub fn cell_range(
        &self,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        let first_column = self.column_index(x_min)?.max(1);
        let last_column = self.column_index(x_max)?.min(self.columns() as i64);
        let first_row = self.row_index(y_min)?.max(1);
        let last_row = self.row_index(y_max)?.min(self.rows() as i64);

        if first_column > last_column || first_row > last_row {
            return None;
        }

        Some((
            first_column as usize..=last_column as usize,
            first_row as usize..=last_row as usize,
        ))
    }

    /// Index of a cell in dense row-major (layer, row, column) buffers.
    pub fn flat_index(&self, key: CellKey) -> usize {
        let layer = key.layer.unwrap_or(1);
        ((layer - 1) * self.rows() + (key.row - 1)) * self.columns() + (key.column - 1)
    }

    /// Inverse of [`Grid::flat_index`].
    pub fn key_of(&self, index: usize) -> CellKey {
        let columns = self.columns();
        let per_layer = self.horizontal_cell_count();
        let layer = index / per_layer;
        let within = index % per_layer;
        CellKey::new(
            within % columns + 1,
            within / columns + 1,
            self.is_layered().then_some(layer + 1),
        )
    }
}

fn validate_vertical(vertical: &VerticalCoordinate) -> Result<()> {
    let levels = vertical.levels();
    if levels.len() < 2 {
        return Err(RegridError::invalid_grid(
            "vertical levels need at least two boundaries",
        ));
    }
    if levels.iter().any(|l| !l.is_finite()) {
        return Err(RegridError::invalid_grid("vertical levels must be finite"));
    }
    let increasing = levels.windows(2).all(|p| p[0] < p[1]);
    let decreasing = levels.windows(2).all(|p| p[0] > p[1]);
    if !increasing && !decreasing {
        return Err(RegridError::invalid_grid(
            "vertical levels must be strictly monotonic",
        ));
    }
    if let VerticalCoordinate::Sigma { top_pressure, .. } = vertical {
        if !(*top_pressure > 0.0 && *top_pressure < SURFACE_PRESSURE) {
            return Err(RegridError::invalid_grid(format!(
                "top_pressure must be in (0, {}), got {}",
                SURFACE_PRESSURE, top_pressure
            )));
        }
    }
    Ok(())
}
