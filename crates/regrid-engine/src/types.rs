//! Core types for regridded output.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::error::{RegridError, Result};

/// How contributions to a cell are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    /// Arithmetic mean of the values (count binning).
    #[default]
    Mean,
    /// Weighted mean: sum(value * weight) / sum(weight).
    Weighted,
}

impl AggregationMethod {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Some(Self::Mean),
            "weighted" | "weighted_mean" => Some(Self::Weighted),
            _ => None,
        }
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self, Self::Weighted)
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Weighted => write!(f, "weighted"),
        }
    }
}

/// 1-based grid cell key. Ordering is row-major: layer, then row, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub layer: Option<usize>,
    pub row: usize,
    pub column: usize,
}

impl CellKey {
    pub fn new(column: usize, row: usize, layer: Option<usize>) -> Self {
        Self { layer, row, column }
    }
}

/// One emitted cell of a sparse timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseEntry {
    pub column: usize,
    pub row: usize,
    pub layer: Option<usize>,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
    pub value: f64,
    pub value2: Option<f64>,
    /// Number of contributions merged into this cell
    pub count: usize,
    pub note: Option<String>,
}

impl SparseEntry {
    pub fn key(&self) -> CellKey {
        CellKey::new(self.column, self.row, self.layer)
    }
}

/// Which optional columns a sparse result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SparseLayout {
    pub layers: bool,
    pub elevations: bool,
    pub values2: bool,
    pub notes: bool,
}

impl SparseLayout {
    /// Columns that every non-empty timestep in `timesteps` can supply.
    ///
    /// Layers and notes are kept when any timestep has them (missing notes
    /// become empty). Elevations and value2 are kept only when every non-empty
    /// timestep has them.
    pub fn common(timesteps: &[SparseTimestepResult]) -> Self {
        let mut non_empty = timesteps.iter().filter(|t| !t.is_empty()).map(|t| t.layout());
        let Some(first) = non_empty.next() else {
            return Self::default();
        };
        non_empty.fold(first, |acc, layout| Self {
            layers: acc.layers || layout.layers,
            elevations: acc.elevations && layout.elevations,
            values2: acc.values2 && layout.values2,
            notes: acc.notes || layout.notes,
        })
    }
}

/// Cells that received data during one timestep, as parallel arrays.
///
/// Every array has the same length (the active cell count). Optional
/// columns are `None` when the timestep does not carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseTimestepResult {
    pub columns: Vec<usize>,
    pub rows: Vec<usize>,
    pub layers: Option<Vec<usize>>,
    pub longitudes: Vec<f64>,
    pub latitudes: Vec<f64>,
    pub elevations: Option<Vec<f64>>,
    pub values: Vec<f64>,
    pub values2: Option<Vec<f64>>,
    pub counts: Vec<usize>,
    pub notes: Option<Vec<String>>,
}

impl SparseTimestepResult {
    /// Create an empty result carrying the columns named by `layout`.
    pub fn with_layout(layout: SparseLayout, capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            rows: Vec::with_capacity(capacity),
            layers: layout.layers.then(|| Vec::with_capacity(capacity)),
            longitudes: Vec::with_capacity(capacity),
            latitudes: Vec::with_capacity(capacity),
            elevations: layout.elevations.then(|| Vec::with_capacity(capacity)),
            values: Vec::with_capacity(capacity),
            values2: layout.values2.then(|| Vec::with_capacity(capacity)),
            counts: Vec::with_capacity(capacity),
            notes: layout.notes.then(|| Vec::with_capacity(capacity)),
        }
    }

    pub fn layout(&self) -> SparseLayout {
        SparseLayout {
            layers: self.layers.is_some(),
            elevations: self.elevations.is_some(),
            values2: self.values2.is_some(),
            notes: self.notes.is_some(),
        }
    }

    /// Copy of this result carrying exactly the columns named by `layout`.
    pub fn with_columns(&self, layout: SparseLayout) -> Self {
        if self.layout() == layout {
            return self.clone();
        }
        let mut result = Self::with_layout(layout, self.len());
        for entry in self.iter() {
            result.push(&entry);
        }
        result
    }

    /// Number of active cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append an entry. Optional fields missing from the entry but carried by
    /// this result are filled with zero (numbers) or an empty note.
    pub fn push(&mut self, entry: &SparseEntry) {
        self.columns.push(entry.column);
        self.rows.push(entry.row);
        if let Some(layers) = self.layers.as_mut() {
            layers.push(entry.layer.unwrap_or(0));
        }
        self.longitudes.push(entry.longitude);
        self.latitudes.push(entry.latitude);
        if let Some(elevations) = self.elevations.as_mut() {
            elevations.push(entry.elevation.unwrap_or(0.0));
        }
        self.values.push(entry.value);
        if let Some(values2) = self.values2.as_mut() {
            values2.push(entry.value2.unwrap_or(0.0));
        }
        self.counts.push(entry.count);
        if let Some(notes) = self.notes.as_mut() {
            notes.push(entry.note.clone().unwrap_or_default());
        }
    }

    /// Entry at `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    pub fn entry(&self, index: usize) -> SparseEntry {
        SparseEntry {
            column: self.columns[index],
            row: self.rows[index],
            layer: self.layers.as_ref().map(|v| v[index]),
            longitude: self.longitudes[index],
            latitude: self.latitudes[index],
            elevation: self.elevations.as_ref().map(|v| v[index]),
            value: self.values[index],
            value2: self.values2.as_ref().map(|v| v[index]),
            count: self.counts[index],
            note: self.notes.as_ref().map(|v| v[index].clone()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SparseEntry> + '_ {
        (0..self.len()).map(move |i| self.entry(i))
    }

    /// Check that all parallel arrays have the same length.
    pub fn validate(&self) -> Result<()> {
        let n = self.values.len();
        let lengths = [
            ("columns", Some(self.columns.len())),
            ("rows", Some(self.rows.len())),
            ("layers", self.layers.as_ref().map(Vec::len)),
            ("longitudes", Some(self.longitudes.len())),
            ("latitudes", Some(self.latitudes.len())),
            ("elevations", self.elevations.as_ref().map(Vec::len)),
            ("values2", self.values2.as_ref().map(Vec::len)),
            ("counts", Some(self.counts.len())),
            ("notes", self.notes.as_ref().map(Vec::len)),
        ];
        for (name, len) in lengths {
            if let Some(len) = len {
                if len != n {
                    return Err(RegridError::invalid_input(format!(
                        "{} has {} entries, expected {}",
                        name, len, n
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Counters for records skipped or accepted while binning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinningStats {
    /// Records that contributed to at least one cell
    pub accepted: usize,
    /// Records mapping entirely outside the grid
    pub out_of_bounds: usize,
    /// Records with a missing or out-of-range value
    pub invalid_value: usize,
    /// Footprints whose corners did not form a usable quadrilateral
    pub invalid_geometry: usize,
    /// Records outside the run's time window
    pub outside_time_window: usize,
}

impl BinningStats {
    pub fn skipped(&self) -> usize {
        self.out_of_bounds + self.invalid_value + self.invalid_geometry + self.outside_time_window
    }
}

impl AddAssign for BinningStats {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.out_of_bounds += other.out_of_bounds;
        self.invalid_value += other.invalid_value;
        self.invalid_geometry += other.invalid_geometry;
        self.outside_time_window += other.outside_time_window;
    }
}

/// Shape of a temporal aggregation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemporalSummary {
    pub new_timestep_count: usize,
    pub total_output_points: usize,
}

/// Ordered sparse timesteps, each covering `hours_per_timestep` hours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedSeries {
    pub timesteps: Vec<SparseTimestepResult>,
    pub hours_per_timestep: usize,
}

impl AggregatedSeries {
    pub fn new(timesteps: Vec<SparseTimestepResult>, hours_per_timestep: usize) -> Self {
        Self {
            timesteps,
            hours_per_timestep,
        }
    }

    /// Active cell count of each timestep.
    pub fn point_counts(&self) -> Vec<usize> {
        self.timesteps.iter().map(SparseTimestepResult::len).collect()
    }

    pub fn total_points(&self) -> usize {
        self.timesteps.iter().map(SparseTimestepResult::len).sum()
    }

    pub fn timestep_count(&self) -> usize {
        self.timesteps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_points() == 0
    }

    pub fn summary(&self) -> TemporalSummary {
        TemporalSummary {
            new_timestep_count: self.timestep_count(),
            total_output_points: self.total_points(),
        }
    }

    /// Turn a series without any points into [`RegridError::EmptyResult`].
    pub fn require_data(self) -> Result<Self> {
        if self.is_empty() {
            Err(RegridError::EmptyResult)
        } else {
            Ok(self)
        }
    }
}

/// A series in flat form: one active-cell count per timestep followed by
/// parallel arrays holding every timestep's entries back to back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatSeries {
    pub point_counts: Vec<usize>,
    pub points: SparseTimestepResult,
}

impl FlatSeries {
    /// Concatenate timesteps. Non-empty timesteps must share one layout.
    pub fn from_timesteps(timesteps: &[SparseTimestepResult]) -> Result<Self> {
        let layout = timesteps
            .iter()
            .find(|t| !t.is_empty())
            .or(timesteps.first())
            .map(SparseTimestepResult::layout)
            .unwrap_or_default();
        let total = timesteps.iter().map(SparseTimestepResult::len).sum();
        let mut points = SparseTimestepResult::with_layout(layout, total);
        let mut point_counts = Vec::with_capacity(timesteps.len());

        for (index, timestep) in timesteps.iter().enumerate() {
            if timestep.layout() != layout && !timestep.is_empty() {
                return Err(RegridError::invalid_input(format!(
                    "timestep {} layout {:?} differs from {:?}",
                    index,
                    timestep.layout(),
                    layout
                )));
            }
            point_counts.push(timestep.len());
            for entry in timestep.iter() {
                points.push(&entry);
            }
        }

        Ok(Self {
            point_counts,
            points,
        })
    }

    /// Split back into one result per timestep.
    pub fn into_timesteps(self) -> Result<Vec<SparseTimestepResult>> {
        self.points.validate()?;
        let total: usize = self.point_counts.iter().sum();
        if total != self.points.len() {
            return Err(RegridError::invalid_input(format!(
                "point counts sum to {} but {} points were supplied",
                total,
                self.points.len()
            )));
        }

        let layout = self.points.layout();
        let mut timesteps = Vec::with_capacity(self.point_counts.len());
        let mut offset = 0;
        for &count in &self.point_counts {
            let mut timestep = SparseTimestepResult::with_layout(layout, count);
            for index in offset..offset + count {
                timestep.push(&self.points.entry(index));
            }
            offset += count;
            timesteps.push(timestep);
        }
        Ok(timesteps)
    }
}
