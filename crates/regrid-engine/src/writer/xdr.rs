//! XDR output: ASCII header followed by big-endian arrays.
//!
//! ```text
//! REGRIDDED-<name>
//! # timesteps hours_per_timestep start:
//! <T> <H> <YYYYMMDDHHMMSS>
//! # Dimensions: timesteps points
//! <T> <P>
//! # Variable names:
//! longitude latitude column row [layer] [elevation] <name> [<name2>] count
//! # Variable units:
//! deg deg - - [-] [m] <units> [<units>] -
//! # MSB 32-bit integers points[timesteps] then per timestep the arrays above
//! # (IEEE-754 64-bit reals, MSB 32-bit integers for column row layer count):
//! ```

use std::io::Write;

use bytes::BytesMut;

use regrid_common::RegridContext;

use crate::codec;
use crate::error::Result;
use crate::types::{AggregatedSeries, SparseTimestepResult};

use super::{column_names, series_layout, OutputFormat, SeriesWriter, VariableInfo};

#[derive(Debug, Clone, Copy, Default)]
pub struct XdrWriter;

impl SeriesWriter for XdrWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Xdr
    }

    fn write(
        &self,
        out: &mut dyn Write,
        series: &AggregatedSeries,
        variable: &VariableInfo,
        context: &RegridContext,
    ) -> Result<()> {
        let layout = series_layout(series)?;
        let columns = column_names(layout, variable);
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        let units: Vec<&str> = columns.iter().map(|(_, units)| units.as_str()).collect();

        writeln!(out, "REGRIDDED-{}", variable.name)?;
        writeln!(out, "# timesteps hours_per_timestep start:")?;
        writeln!(
            out,
            "{} {} {}",
            series.timestep_count(),
            series.hours_per_timestep,
            context.start()
        )?;
        writeln!(out, "# Dimensions: timesteps points")?;
        writeln!(out, "{} {}", series.timestep_count(), series.total_points())?;
        writeln!(out, "# Variable names:")?;
        writeln!(out, "{}", names.join(" "))?;
        writeln!(out, "# Variable units:")?;
        writeln!(out, "{}", units.join(" "))?;
        writeln!(
            out,
            "# MSB 32-bit integers points[timesteps] then per timestep the arrays above"
        )?;
        writeln!(
            out,
            "# (IEEE-754 64-bit reals, MSB 32-bit integers for column row layer count):"
        )?;

        let mut buf = BytesMut::with_capacity(series.timestep_count() * codec::I32_SIZE);
        codec::put_indices(&mut buf, &series.point_counts())?;
        out.write_all(&buf)?;

        for timestep in &series.timesteps {
            buf.clear();
            encode_timestep(&mut buf, timestep)?;
            out.write_all(&buf)?;
        }

        Ok(())
    }
}

fn encode_timestep(buf: &mut BytesMut, timestep: &SparseTimestepResult) -> Result<()> {
    codec::put_f64s(buf, &timestep.longitudes);
    codec::put_f64s(buf, &timestep.latitudes);
    codec::put_indices(buf, &timestep.columns)?;
    codec::put_indices(buf, &timestep.rows)?;
    if let Some(layers) = &timestep.layers {
        codec::put_indices(buf, layers)?;
    }
    if let Some(elevations) = &timestep.elevations {
        codec::put_f64s(buf, elevations);
    }
    codec::put_f64s(buf, &timestep.values);
    if let Some(values2) = &timestep.values2 {
        codec::put_f64s(buf, values2);
    }
    codec::put_indices(buf, &timestep.counts)?;
    Ok(())
}
