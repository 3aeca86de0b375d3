//! Full runs of the regridder from config and input files to output files.

use std::fs;
use std::path::Path;

use regrid_common::Timestamp;
use regrid_engine::{OutputFormat, RegridError};
use regridder::{execute, load_run_config, write_output, AggregatePeriod, RunOptions};
use test_utils::fixtures;

const CONFIG: &str = r#"
projection:
  type: identity
grid:
  columns: 3
  rows: 3
  west_edge: 0.0
  south_edge: 0.0
  cell_width: 10.0
  cell_height: 10.0
variable:
  name: pm25
  units: ug/m3
regrid:
  aggregation_method: ${REGRID_E2E_METHOD:-mean}
  minimum_valid_value: 0.0
  hours_per_period: 1
  parallel: false
"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn options(input: std::path::PathBuf, footprints: bool) -> RunOptions {
    RunOptions {
        input,
        start: Timestamp::new(20240101000000),
        hours: 2,
        aggregate: Some(AggregatePeriod::All),
        footprints,
    }
}

#[test]
fn test_points_to_ascii() {
    let dir = fixtures::temp_dir();
    let config = load_run_config(write(dir.path(), "run.yaml", CONFIG)).unwrap();
    let input = write(
        dir.path(),
        "points.txt",
        "\
timestamp longitude latitude value
20240101000000 5.0 5.0 2.0
20240101010000 5.5 4.5 4.0
20240101010000 25.0 25.0 1.0
20240101010000 45.0 25.0 9.0
20240102000000 5.0 5.0 100.0
not a valid line
",
    );

    let (ctx, outcome) = execute(&config, &options(input, false)).unwrap();
    assert_eq!(outcome.stats.accepted, 3);
    assert_eq!(outcome.stats.out_of_bounds, 1);

    let output = dir.path().join("out.txt");
    write_output(&config, &ctx, outcome, OutputFormat::Ascii, Some(&output)).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Timestamp(UTC)"));
    assert!(lines[0].contains("PM25(ug/m3)"));
    assert_eq!(lines[1], "2024-01-01T00:00:00-0000\t5.00000\t5.00000\t1\t1\t3\t2");
    assert_eq!(lines[2], "2024-01-01T00:00:00-0000\t25.00000\t25.00000\t3\t3\t1\t1");
}

#[test]
fn test_footprints_to_xdr() {
    std::env::set_var("REGRID_E2E_METHOD", "weighted");
    let dir = fixtures::temp_dir();
    let config = load_run_config(write(dir.path(), "run.yaml", CONFIG)).unwrap();
    std::env::remove_var("REGRID_E2E_METHOD");

    let input = write(
        dir.path(),
        "footprints.txt",
        "\
# one footprint inside cell (2, 2)
timestamp lon_sw lat_sw lon_se lat_se lon_nw lat_nw lon_ne lat_ne value
20240101000000 12.0 12.0 18.0 12.0 12.0 18.0 18.0 18.0 6.0
",
    );

    let (ctx, outcome) = execute(&config, &options(input, true)).unwrap();
    assert_eq!(outcome.series.total_points(), 1);

    let output = dir.path().join("out.xdr");
    write_output(&config, &ctx, outcome, OutputFormat::Xdr, Some(&output)).unwrap();

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"REGRIDDED-pm25\n"));
}

#[test]
fn test_no_data_is_distinguishable() {
    let dir = fixtures::temp_dir();
    let config = load_run_config(write(dir.path(), "run.yaml", CONFIG)).unwrap();
    let input = write(
        dir.path(),
        "points.txt",
        "timestamp longitude latitude value\n20240101000000 95.0 5.0 2.0\n",
    );

    let (ctx, outcome) = execute(&config, &options(input, false)).unwrap();
    let err = write_output(&config, &ctx, outcome, OutputFormat::Ascii, None).unwrap_err();

    let regrid_error = err.downcast_ref::<RegridError>().unwrap();
    assert!(regrid_error.is_empty_result());
}

#[test]
fn test_missing_input_file() {
    let dir = fixtures::temp_dir();
    let config = load_run_config(write(dir.path(), "run.yaml", CONFIG)).unwrap();

    let result = execute(&config, &options(dir.path().join("absent.txt"), false));
    assert!(result.is_err());
}
