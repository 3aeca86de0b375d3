//! Tab-separated text output.

use std::io::Write;

use regrid_common::RegridContext;

use crate::error::Result;
use crate::types::AggregatedSeries;

use super::{column_names, series_layout, OutputFormat, SeriesWriter, VariableInfo};

/// Writes a header line then one line per point:
///
/// ```text
/// Timestamp(UTC)  LONGITUDE(deg)  LATITUDE(deg)  COLUMN(-)  ROW(-)  [LAYER(-)]  [ELEVATION(m)]  NAME(units)  [NAME2(units)]  COUNT(-)  [NOTE]
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiWriter;

impl SeriesWriter for AsciiWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Ascii
    }

    fn write(
        &self,
        out: &mut dyn Write,
        series: &AggregatedSeries,
        variable: &VariableInfo,
        context: &RegridContext,
    ) -> Result<()> {
        let layout = series_layout(series)?;

        let mut header = vec!["Timestamp(UTC)".to_string()];
        header.extend(
            column_names(layout, variable)
                .into_iter()
                .map(|(name, units)| format!("{}({})", name.to_uppercase(), units)),
        );
        if layout.notes {
            header.push("NOTE".to_string());
        }
        writeln!(out, "{}", header.join("\t"))?;

        for (index, timestep) in series.timesteps.iter().enumerate() {
            let time = context
                .step_start(index, series.hours_per_timestep)
                .to_iso8601()?;

            for entry in timestep.iter() {
                let mut fields = vec![
                    time.clone(),
                    format!("{:.5}", entry.longitude),
                    format!("{:.5}", entry.latitude),
                    entry.column.to_string(),
                    entry.row.to_string(),
                ];
                if let Some(layer) = entry.layer {
                    fields.push(layer.to_string());
                }
                if let Some(elevation) = entry.elevation {
                    fields.push(format!("{:.2}", elevation));
                }
                fields.push(entry.value.to_string());
                if let Some(value2) = entry.value2 {
                    fields.push(value2.to_string());
                }
                fields.push(entry.count.to_string());
                if let Some(note) = entry.note {
                    fields.push(note);
                }
                writeln!(out, "{}", fields.join("\t"))?;
            }
        }

        Ok(())
    }
}
