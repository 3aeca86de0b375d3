//! Output writers for regridded series.
//!
//! Each output format is one [`SeriesWriter`] implementation, selected from
//! an [`OutputFormat`] with [`OutputFormat::writer`].

mod ascii;
mod xdr;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use regrid_common::RegridContext;

use crate::error::{RegridError, Result};
use crate::types::{AggregatedSeries, SparseLayout};

pub use ascii::AsciiWriter;
pub use xdr::XdrWriter;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated text, one line per point.
    #[default]
    Ascii,
    /// ASCII header followed by big-endian binary arrays.
    Xdr,
}

impl OutputFormat {
    /// Writer implementing this format.
    pub fn writer(self) -> Box<dyn SeriesWriter> {
        match self {
            Self::Ascii => Box::new(AsciiWriter),
            Self::Xdr => Box::new(XdrWriter),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ascii => "txt",
            Self::Xdr => "xdr",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = RegridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ascii" => Ok(Self::Ascii),
            "xdr" => Ok(Self::Xdr),
            other => Err(RegridError::invalid_config(format!(
                "unknown output format '{}', expected ascii or xdr",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii => write!(f, "ascii"),
            Self::Xdr => write!(f, "xdr"),
        }
    }
}

/// Name and units of the regridded variable(s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub units: String,
    /// Name of the second component, when the input carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name2: Option<String>,
}

impl VariableInfo {
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            name2: None,
        }
    }

    pub fn with_name2(mut self, name2: impl Into<String>) -> Self {
        self.name2 = Some(name2.into());
        self
    }

    /// Column name of the second component.
    fn second_name(&self) -> String {
        self.name2
            .clone()
            .unwrap_or_else(|| format!("{}2", self.name))
    }
}

/// Serializes an aggregated series.
pub trait SeriesWriter {
    fn format(&self) -> OutputFormat;

    /// Write `series` to `out`. Timestep `i` starts at
    /// `context.step_start(i, series.hours_per_timestep)`.
    fn write(
        &self,
        out: &mut dyn Write,
        series: &AggregatedSeries,
        variable: &VariableInfo,
        context: &RegridContext,
    ) -> Result<()>;
}

/// Layout shared by the series' non-empty timesteps.
fn series_layout(series: &AggregatedSeries) -> Result<SparseLayout> {
    let mut non_empty = series.timesteps.iter().filter(|t| !t.is_empty());
    let layout = non_empty.next().map(|t| t.layout()).unwrap_or_default();
    if let Some(other) = non_empty.find(|t| t.layout() != layout) {
        return Err(RegridError::invalid_input(format!(
            "timestep layouts differ: {:?} vs {:?}",
            layout,
            other.layout()
        )));
    }
    Ok(layout)
}

/// (name, units) of each output column in write order.
fn column_names(layout: SparseLayout, variable: &VariableInfo) -> Vec<(String, String)> {
    let mut columns = vec![
        ("longitude".to_string(), "deg".to_string()),
        ("latitude".to_string(), "deg".to_string()),
        ("column".to_string(), "-".to_string()),
        ("row".to_string(), "-".to_string()),
    ];
    if layout.layers {
        columns.push(("layer".to_string(), "-".to_string()));
    }
    if layout.elevations {
        columns.push(("elevation".to_string(), "m".to_string()));
    }
    columns.push((variable.name.clone(), variable.units.clone()));
    if layout.values2 {
        columns.push((variable.second_name(), variable.units.clone()));
    }
    columns.push(("count".to_string(), "-".to_string()));
    columns
}
