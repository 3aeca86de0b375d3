//! Regrid point observations or swath footprints onto a projected grid.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use regrid_common::Timestamp;
use regrid_engine::{OutputFormat, RegridError};
use regridder::{execute, load_run_config, validate_options, write_output, AggregatePeriod, RunOptions};

/// Exit code for a run that produced no data
const EXIT_NO_DATA: u8 = 2;

/// Observation regridder
#[derive(Parser, Debug)]
#[command(name = "regrid")]
#[command(about = "Regrid geolocated observations onto a map-projected grid")]
struct Args {
    /// Run configuration (projection, grid, variable, regrid settings)
    #[arg(short, long, default_value = "config/regrid.yaml", env = "REGRID_CONFIG")]
    config: PathBuf,

    /// Whitespace-separated input with a header line
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First hour of the run (YYYYMMDDHHMMSS or ISO 8601)
    #[arg(long)]
    start: String,

    /// Number of hours in the run
    #[arg(long, default_value = "24")]
    hours: usize,

    /// Temporal aggregation: none, daily, all or a number of hours
    #[arg(long, env = "REGRID_AGGREGATE")]
    aggregate: Option<AggregatePeriod>,

    /// Output format: ascii or xdr
    #[arg(long, default_value = "ascii", env = "REGRID_FORMAT")]
    format: OutputFormat,

    /// Input holds four-corner footprints instead of points
    #[arg(long)]
    footprints: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "REGRID_LOG_JSON")]
    log_json: bool,
}

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_no_data(&e) => {
            warn!("No data regridded for the requested period");
            ExitCode::from(EXIT_NO_DATA)
        }
        Err(e) => {
            error!("Regrid run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so stdout can carry the output
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_run_config(&args.config)?;
    let start = Timestamp::parse(&args.start)
        .with_context(|| format!("Invalid --start '{}'", args.start))?;

    let options = RunOptions {
        input: args.input,
        start,
        hours: args.hours,
        aggregate: args.aggregate,
        footprints: args.footprints,
    };
    validate_options(&options)?;

    let (ctx, outcome) = execute(&config, &options)?;
    info!(
        accepted = outcome.stats.accepted,
        skipped = outcome.stats.skipped(),
        points = outcome.series.total_points(),
        "Regrid complete"
    );

    write_output(&config, &ctx, outcome, args.format, args.output.as_deref())
}

fn is_no_data(e: &anyhow::Error) -> bool {
    e.downcast_ref::<RegridError>()
        .is_some_and(RegridError::is_empty_result)
}
