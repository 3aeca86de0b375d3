//! One regridding run: read input, regrid, write output.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing::info;

use regrid_common::{RegridContext, Timestamp};
use regrid_engine::{Grid, OutputFormat, RegridOutcome, Regridder};

use crate::config::RunConfig;
use crate::input::{read_footprints, read_observations};

/// Temporal aggregation requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatePeriod {
    /// Keep hourly timesteps
    None,
    /// 24 hour periods
    Daily,
    /// A single period spanning the whole run
    All,
    /// A fixed number of hours per period
    Hours(usize),
}

impl AggregatePeriod {
    /// Hours per output period for a run of `run_hours` hours.
    pub fn hours_per_period(&self, run_hours: usize) -> usize {
        match self {
            Self::None => 1,
            Self::Daily => 24,
            Self::All => run_hours,
            Self::Hours(hours) => *hours,
        }
    }
}

impl FromStr for AggregatePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "hourly" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "all" => Ok(Self::All),
            other => match other.parse::<usize>() {
                Ok(0) => Err("aggregation period must be at least one hour".to_string()),
                Ok(hours) => Ok(Self::Hours(hours)),
                Err(_) => Err(format!(
                    "unknown aggregation period '{}' (expected none, daily, all or a number of hours)",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for AggregatePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Daily => write!(f, "daily"),
            Self::All => write!(f, "all"),
            Self::Hours(hours) => write!(f, "{}", hours),
        }
    }
}

/// Per-run options that come from the command line rather than the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub start: Timestamp,
    pub hours: usize,
    /// Overrides `regrid.hours_per_period` when set
    pub aggregate: Option<AggregatePeriod>,
    pub footprints: bool,
}

/// Read the input named by `options` and regrid it.
pub fn execute(config: &RunConfig, options: &RunOptions) -> Result<(RegridContext, RegridOutcome)> {
    let ctx = RegridContext::new(options.start, options.hours).context("Invalid run period")?;

    let mut regrid = config.regrid.clone();
    if let Some(period) = options.aggregate {
        regrid.hours_per_period = period.hours_per_period(ctx.hours());
    }

    let projector = config
        .projection
        .build()
        .context("Failed to build projection")?;
    let grid = Grid::new(config.grid.clone()).context("Invalid grid definition")?;
    let regridder = Regridder::new(grid, projector, regrid)?;

    info!(
        input = %options.input.display(),
        projection = config.projection.name(),
        start = %ctx.start(),
        hours = ctx.hours(),
        hours_per_period = regridder.config().hours_per_period,
        footprints = options.footprints,
        "Starting regrid run"
    );

    let file = File::open(&options.input)
        .with_context(|| format!("Failed to open input {:?}", options.input))?;
    let reader = BufReader::new(file);

    let outcome = if options.footprints {
        let input = read_footprints(reader)?;
        log_input(input.records.len(), input.skipped_lines);
        regridder.regrid_footprints(&ctx, &input.records)?
    } else {
        let input = read_observations(reader)?;
        log_input(input.records.len(), input.skipped_lines);
        regridder.regrid_points(&ctx, &input.records)?
    };

    Ok((ctx, outcome))
}

fn log_input(records: usize, skipped_lines: usize) {
    info!(records, skipped_lines, "Read input");
}

/// Write a series to `output`, or to stdout when no path is given.
pub fn write_output(
    config: &RunConfig,
    ctx: &RegridContext,
    outcome: RegridOutcome,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let series = outcome.require_data()?;
    let writer = format.writer();

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output {:?}", path))?;
            let mut out = BufWriter::new(file);
            writer.write(&mut out, &series, &config.variable, ctx)?;
            out.flush()
                .with_context(|| format!("Failed to flush output {:?}", path))?;
            info!(path = %path.display(), format = %format, points = series.total_points(), "Wrote output");
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writer.write(&mut out, &series, &config.variable, ctx)?;
            out.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}

/// Check command-line values the parser cannot express.
pub fn validate_options(options: &RunOptions) -> Result<()> {
    if options.hours == 0 {
        bail!("--hours must be at least 1");
    }
    if let Some(AggregatePeriod::Hours(h)) = options.aggregate {
        if h > options.hours {
            bail!(
                "Aggregation period of {} hours exceeds the {} hour run",
                h,
                options.hours
            );
        }
    }
    Ok(())
}
