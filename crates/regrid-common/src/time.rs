//! Timestamp handling for hourly regridding.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TimeError, TimeResult};

pub const SECONDS_PER_HOUR: i64 = 3600;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A UTC time stored as the integer YYYYMMDDHHMMSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wrap a raw YYYYMMDDHHMMSS integer. Validity is checked on conversion.
    pub const fn new(yyyymmddhhmmss: i64) -> Self {
        Self(yyyymmddhhmmss)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parse from text, accepting YYYYMMDDHHMMSS or ISO 8601
    /// (`2024-01-15T12:00:00Z`, `2024-01-15T12:00:00`).
    pub fn parse(s: &str) -> TimeResult<Self> {
        let s = s.trim();

        if s.len() == 14 && s.bytes().all(|b| b.is_ascii_digit()) {
            let raw: i64 = s
                .parse()
                .map_err(|_| TimeError::InvalidFormat(s.to_string()))?;
            let ts = Self(raw);
            ts.to_datetime()?;
            return Ok(ts);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_datetime(&dt.with_timezone(&Utc)));
        }

        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(Self::from_datetime(&Utc.from_utc_datetime(&ndt)));
        }

        Err(TimeError::InvalidFormat(s.to_string()))
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        // Formatting digits only, so the parse cannot fail for years 0..=9999.
        Self(dt.format(TIMESTAMP_FORMAT).to_string().parse().unwrap_or(0))
    }

    /// Convert to a UTC datetime, rejecting impossible calendar values.
    pub fn to_datetime(&self) -> TimeResult<DateTime<Utc>> {
        if self.0 < 0 {
            return Err(TimeError::InvalidTimestamp(self.0));
        }
        let text = format!("{:014}", self.0);
        NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
            .map(|ndt| Utc.from_utc_datetime(&ndt))
            .map_err(|_| TimeError::InvalidTimestamp(self.0))
    }

    /// Seconds since 1970-01-01T00:00:00Z.
    pub fn epoch_seconds(&self) -> TimeResult<i64> {
        Ok(self.to_datetime()?.timestamp())
    }

    /// ISO 8601 text (`YYYY-MM-DDTHH:MM:SS-0000`) as written in output headers.
    pub fn to_iso8601(&self) -> TimeResult<String> {
        Ok(self.to_datetime()?.format("%Y-%m-%dT%H:%M:%S-0000").to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:014}", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// The time window of one regridding run: `hours` consecutive hourly
/// timesteps beginning at `start`.
///
/// The start time is converted to epoch seconds once, here, and every
/// record's timestep is derived from it.
#[derive(Debug, Clone)]
pub struct RegridContext {
    start: Timestamp,
    hours: usize,
    start_seconds: i64,
}

impl RegridContext {
    pub fn new(start: Timestamp, hours: usize) -> TimeResult<Self> {
        if hours == 0 {
            return Err(TimeError::InvalidHours(hours));
        }
        let start_seconds = start.epoch_seconds()?;
        Ok(Self {
            start,
            hours,
            start_seconds,
        })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn hours(&self) -> usize {
        self.hours
    }

    /// Zero-based hourly timestep containing `timestamp`, or `None` when it
    /// falls outside the run window or is not a valid time.
    pub fn hour_index(&self, timestamp: Timestamp) -> Option<usize> {
        let seconds = timestamp.epoch_seconds().ok()?;
        let offset = seconds - self.start_seconds;
        if offset < 0 {
            return None;
        }
        let index = (offset / SECONDS_PER_HOUR) as usize;
        (index < self.hours).then_some(index)
    }

    /// Start time of the timestep `hours_per_step * index` hours after start.
    pub fn step_start(&self, index: usize, hours_per_step: usize) -> Timestamp {
        let offset = Duration::hours((index * hours_per_step) as i64);
        let start = Utc
            .timestamp_opt(self.start_seconds, 0)
            .single()
            .unwrap_or_default();
        Timestamp::from_datetime(&(start + offset))
    }
}
