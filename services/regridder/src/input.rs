//! Whitespace-separated text readers for observations and footprints.
//!
//! The first non-comment line is a header naming the columns, e.g.
//!
//! ```text
//! # hourly surface PM2.5
//! timestamp longitude latitude value weight
//! 20240101000000 -97.25 38.10 12.5 1.0
//! ```
//!
//! Column names are matched case-insensitively and may appear in any order.
//! Lines starting with `#` and blank lines are ignored. A data line that does
//! not parse is logged and skipped; a header missing a required column is an
//! error.

use std::collections::HashMap;
use std::io::BufRead;

use anyhow::{anyhow, bail, Context, Result};
use tracing::warn;

use regrid_common::{Footprint, Observation, Timestamp};

/// Footprint corner columns, ordered SW, SE, NW, NE.
const CORNER_COLUMNS: [(&str, &str); 4] = [
    ("lon_sw", "lat_sw"),
    ("lon_se", "lat_se"),
    ("lon_nw", "lat_nw"),
    ("lon_ne", "lat_ne"),
];

/// Records read from one input stream.
#[derive(Debug, Clone)]
pub struct InputRecords<T> {
    pub records: Vec<T>,
    /// Data lines that failed to parse
    pub skipped_lines: usize,
}

/// Column positions resolved from the header line.
struct Header {
    positions: HashMap<String, usize>,
    width: usize,
}

impl Header {
    fn parse(line: &str) -> Result<Self> {
        let mut positions = HashMap::new();
        let mut width = 0;
        for (index, name) in line.split_whitespace().enumerate() {
            let name = name.to_ascii_lowercase();
            if positions.insert(name.clone(), index).is_some() {
                bail!("Duplicate column in header: {}", name);
            }
            width = index + 1;
        }
        Ok(Self { positions, width })
    }

    fn required(&self, names: &[&str]) -> Result<usize> {
        names
            .iter()
            .find_map(|name| self.positions.get(*name).copied())
            .ok_or_else(|| anyhow!("Header is missing required column '{}'", names[0]))
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

struct ObservationColumns {
    timestamp: usize,
    longitude: usize,
    latitude: usize,
    value: usize,
    elevation: Option<usize>,
    value2: Option<usize>,
    weight: Option<usize>,
    note: Option<usize>,
}

impl ObservationColumns {
    fn from_header(header: &Header) -> Result<Self> {
        Ok(Self {
            timestamp: header.required(&["timestamp"])?,
            longitude: header.required(&["longitude", "lon"])?,
            latitude: header.required(&["latitude", "lat"])?,
            value: header.required(&["value"])?,
            elevation: header.optional("elevation"),
            value2: header.optional("value2"),
            weight: header.optional("weight"),
            note: header.optional("note"),
        })
    }

    fn parse(&self, fields: &[&str]) -> Result<Observation> {
        let mut observation = Observation::new(
            parse_timestamp(fields[self.timestamp])?,
            parse_number(fields[self.longitude], "longitude")?,
            parse_number(fields[self.latitude], "latitude")?,
            parse_number(fields[self.value], "value")?,
        );
        if let Some(i) = self.elevation {
            observation = observation.with_elevation(parse_number(fields[i], "elevation")?);
        }
        if let Some(i) = self.value2 {
            observation = observation.with_value2(parse_number(fields[i], "value2")?);
        }
        if let Some(i) = self.weight {
            observation = observation.with_weight(parse_number(fields[i], "weight")?);
        }
        if let Some(i) = self.note {
            observation = observation.with_note(fields[i]);
        }
        Ok(observation)
    }
}

struct FootprintColumns {
    timestamp: usize,
    corners: [(usize, usize); 4],
    value: usize,
}

impl FootprintColumns {
    fn from_header(header: &Header) -> Result<Self> {
        let mut corners = [(0, 0); 4];
        for (slot, (lon, lat)) in corners.iter_mut().zip(CORNER_COLUMNS) {
            *slot = (header.required(&[lon])?, header.required(&[lat])?);
        }
        Ok(Self {
            timestamp: header.required(&["timestamp"])?,
            corners,
            value: header.required(&["value"])?,
        })
    }

    fn parse(&self, fields: &[&str]) -> Result<Footprint> {
        let mut corners = [(0.0, 0.0); 4];
        for (corner, &(lon, lat)) in corners.iter_mut().zip(&self.corners) {
            *corner = (
                parse_number(fields[lon], "corner longitude")?,
                parse_number(fields[lat], "corner latitude")?,
            );
        }
        Ok(Footprint::new(
            parse_timestamp(fields[self.timestamp])?,
            corners,
            parse_number(fields[self.value], "value")?,
        ))
    }
}

/// Read point observations.
pub fn read_observations<R: BufRead>(reader: R) -> Result<InputRecords<Observation>> {
    read_records(reader, ObservationColumns::from_header, |columns, fields| {
        columns.parse(fields)
    })
}

/// Read four-corner footprints.
pub fn read_footprints<R: BufRead>(reader: R) -> Result<InputRecords<Footprint>> {
    read_records(reader, FootprintColumns::from_header, |columns, fields| {
        columns.parse(fields)
    })
}

fn read_records<R, C, T>(
    reader: R,
    columns_from: impl Fn(&Header) -> Result<C>,
    parse: impl Fn(&C, &[&str]) -> Result<T>,
) -> Result<InputRecords<T>>
where
    R: BufRead,
{
    let mut header: Option<(Header, C)> = None;
    let mut records = Vec::new();
    let mut skipped_lines = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("Failed to read input line {}", line_number))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((parsed, columns)) = &header else {
            let parsed = Header::parse(trimmed)
                .with_context(|| format!("Invalid header on line {}", line_number))?;
            let columns = columns_from(&parsed)
                .with_context(|| format!("Invalid header on line {}", line_number))?;
            header = Some((parsed, columns));
            continue;
        };

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let record = if fields.len() != parsed.width {
            Err(anyhow!(
                "expected {} fields, found {}",
                parsed.width,
                fields.len()
            ))
        } else {
            parse(columns, &fields)
        };

        match record {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed input line");
                skipped_lines += 1;
            }
        }
    }

    if header.is_none() {
        bail!("Input has no header line");
    }

    Ok(InputRecords {
        records,
        skipped_lines,
    })
}

fn parse_timestamp(field: &str) -> Result<Timestamp> {
    Timestamp::parse(field).with_context(|| format!("invalid timestamp '{}'", field))
}

fn parse_number(field: &str, what: &str) -> Result<f64> {
    field
        .parse::<f64>()
        .with_context(|| format!("invalid {} '{}'", what, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_observations_with_optional_columns() {
        let text = "\
# comment
TIMESTAMP Longitude Latitude Elevation Value Value2 Weight Note

20240101000000 -97.5 38.25 120.0 12.5 3.0 2.0 site_a
2024-01-01T01:00:00Z -97.0 38.0 80.0 7.0 1.5 0.5 site_b
";
        let input = read_observations(Cursor::new(text)).unwrap();

        assert_eq!(input.skipped_lines, 0);
        assert_eq!(input.records.len(), 2);
        let first = &input.records[0];
        assert_eq!(first.timestamp, Timestamp::new(20240101000000));
        assert_eq!((first.longitude, first.latitude), (-97.5, 38.25));
        assert_eq!(first.elevation, Some(120.0));
        assert_eq!(first.value2, Some(3.0));
        assert_eq!(first.weight, Some(2.0));
        assert_eq!(first.note.as_deref(), Some("site_a"));
        assert_eq!(input.records[1].timestamp, Timestamp::new(20240101010000));
    }

    #[test]
    fn test_column_order_and_aliases() {
        let text = "value lat lon timestamp\n4.0 10.0 20.0 20240101000000\n";
        let input = read_observations(Cursor::new(text)).unwrap();

        let obs = &input.records[0];
        assert_eq!((obs.longitude, obs.latitude, obs.value), (20.0, 10.0, 4.0));
        assert!(obs.elevation.is_none());
        assert!(obs.weight.is_none());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let text = "\
timestamp longitude latitude value
20240101000000 -97.5 38.25 12.5
20240101000000 -97.5 abc 12.5
20241399000000 -97.5 38.25 12.5
20240101000000 -97.5 38.25
20240101020000 -96.0 37.0 1.0
";
        let input = read_observations(Cursor::new(text)).unwrap();

        assert_eq!(input.records.len(), 2);
        assert_eq!(input.skipped_lines, 3);
    }

    #[test]
    fn test_missing_required_column() {
        let text = "timestamp longitude value\n20240101000000 1.0 2.0\n";
        let err = read_observations(Cursor::new(text)).unwrap_err();
        assert!(format!("{:#}", err).contains("latitude"));
    }

    #[test]
    fn test_missing_header() {
        assert!(read_observations(Cursor::new("# only comments\n\n")).is_err());
    }

    #[test]
    fn test_read_footprints() {
        let text = "\
timestamp lon_sw lat_sw lon_se lat_se lon_nw lat_nw lon_ne lat_ne value
20240101000000 0.0 0.0 1.0 0.0 0.0 1.0 1.0 1.0 0.75
20240101000000 0.0 0.0 1.0 0.0 0.0 1.0 1.0 x 0.75
";
        let input = read_footprints(Cursor::new(text)).unwrap();

        assert_eq!(input.records.len(), 1);
        assert_eq!(input.skipped_lines, 1);
        let footprint = &input.records[0];
        assert_eq!(
            footprint.corners,
            [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
        );
        assert_eq!(footprint.value, 0.75);
    }

    #[test]
    fn test_footprint_header_requires_all_corners() {
        let text = "timestamp lon_sw lat_sw lon_se lat_se lon_nw lat_nw value\n";
        let err = read_footprints(Cursor::new(text)).unwrap_err();
        assert!(format!("{:#}", err).contains("lon_ne"));
    }
}
