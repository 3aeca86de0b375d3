//! Run-level regridding: hourly partitioning, per-hour binning and temporal
//! aggregation.
//!
//! Points are binned per hour and merged by the TemporalAggregator. Footprints
//! accumulate over a whole output period and are finalised once per period.
//!
//! ```text
//! records ──► partition by hour (RegridContext)
//!                  │
//!     points:      ├─► hour 0 ──► PointBinner ──► sparse ─┐
//!                  ├─► hour 1 ──► ...                     ├─► TemporalAggregator
//!                  └─► ...        (rayon, one per hour)   ┘   (hours_per_period > 1)
//!
//!     footprints:  hours 0..K ──► FootprintAccumulator ──► finish ──► sparse
//!                  hours K..2K ─► ...  (rayon, one accumulator per period)
//! ```

use rayon::prelude::*;

use projection::Projector;
use regrid_common::{Footprint, Observation, RegridContext, Timestamp};

use crate::aggregate;
use crate::binning::{FootprintAccumulator, PointBinner};
use crate::config::RegridConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::spill::SpillWriter;
use crate::types::{AggregatedSeries, BinningStats, SparseLayout, SparseTimestepResult};

/// Output of a regridding run.
#[derive(Debug, Clone)]
pub struct RegridOutcome {
    pub series: AggregatedSeries,
    pub stats: BinningStats,
}

impl RegridOutcome {
    /// The series, or [`crate::RegridError::EmptyResult`] when no cell
    /// received data.
    pub fn require_data(self) -> Result<AggregatedSeries> {
        self.series.require_data()
    }
}

/// Regrids point observations or footprints onto one grid.
pub struct Regridder<P: Projector> {
    grid: Grid,
    projector: P,
    config: RegridConfig,
}

impl<P: Projector> Regridder<P> {
    pub fn new(grid: Grid, projector: P, config: RegridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid,
            projector,
            config,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn projector(&self) -> &P {
        &self.projector
    }

    pub fn config(&self) -> &RegridConfig {
        &self.config
    }

    /// Regrid point observations covering `ctx`.
    pub fn regrid_points(
        &self,
        ctx: &RegridContext,
        observations: &[Observation],
    ) -> Result<RegridOutcome> {
        let (hours, outside) = partition_by_hour(ctx, observations, |o| o.timestamp);
        let binner = PointBinner::new(&self.grid, &self.projector);
        let method = self.config.aggregation_method;
        let minimum = self.config.minimum_valid_value;

        let bin = |hour: &Vec<&Observation>| binner.regrid(method, minimum, hour.iter().copied());
        let binned: Vec<(SparseTimestepResult, BinningStats)> = if self.config.parallel {
            hours.par_iter().map(bin).collect()
        } else {
            hours.iter().map(bin).collect()
        };

        let mut stats = BinningStats {
            outside_time_window: outside,
            ..Default::default()
        };
        let mut hourly = Vec::with_capacity(binned.len());
        for (timestep, hour_stats) in binned {
            stats += hour_stats;
            hourly.push(timestep);
        }

        let layout = SparseLayout::common(&hourly);
        let hourly: Vec<_> = hourly.iter().map(|t| t.with_columns(layout)).collect();

        let series = self.aggregate_hours(hourly)?;
        log_run("points", observations.len(), &stats, &series);
        Ok(RegridOutcome { series, stats })
    }

    /// Regrid footprints covering `ctx`. All hours of one output period feed
    /// a single accumulator, which is finalised once at the period boundary,
    /// so each footprint counts once in its period's cell means.
    ///
    /// With a spill threshold configured, periods are binned one at a time and
    /// compacted timesteps move to a spill file once the threshold is passed.
    pub fn regrid_footprints(
        &self,
        ctx: &RegridContext,
        footprints: &[Footprint],
    ) -> Result<RegridOutcome> {
        let (hours, outside) = partition_by_hour(ctx, footprints, |f| f.timestamp);
        let mut stats = BinningStats {
            outside_time_window: outside,
            ..Default::default()
        };
        let period = self.config.hours_per_period;

        let timesteps = if self.config.spill_threshold_points > 0 {
            self.regrid_footprints_spilling(&hours, &mut stats)?
        } else {
            let binned: Vec<(SparseTimestepResult, BinningStats)> = if self.config.parallel {
                hours
                    .par_chunks(period)
                    .map(|group| self.bin_footprint_period(group))
                    .collect::<Result<_>>()?
            } else {
                hours
                    .chunks(period)
                    .map(|group| self.bin_footprint_period(group))
                    .collect::<Result<_>>()?
            };

            let mut timesteps = Vec::with_capacity(binned.len());
            for (timestep, period_stats) in binned {
                stats += period_stats;
                timesteps.push(timestep);
            }
            timesteps
        };

        let series = AggregatedSeries::new(timesteps, period);
        log_run("footprints", footprints.len(), &stats, &series);
        Ok(RegridOutcome { series, stats })
    }

    /// Bin every hour of one output period into one accumulator.
    fn bin_footprint_period(
        &self,
        group: &[Vec<&Footprint>],
    ) -> Result<(SparseTimestepResult, BinningStats)> {
        let mut accumulator = self.footprint_accumulator()?;
        for hour in group {
            accumulator.regrid_footprints(hour.iter().copied());
        }
        accumulator.finish()
    }

    fn footprint_accumulator(&self) -> Result<FootprintAccumulator<'_, P>> {
        FootprintAccumulator::new(
            &self.grid,
            &self.projector,
            self.config.aggregation_method,
            self.config.minimum_valid_value,
        )
    }

    fn aggregate_hours(&self, hourly: Vec<SparseTimestepResult>) -> Result<AggregatedSeries> {
        if self.config.hours_per_period > 1 {
            aggregate::aggregate(self.config.hours_per_period, &hourly)
        } else {
            Ok(AggregatedSeries::new(hourly, 1))
        }
    }

    fn regrid_footprints_spilling(
        &self,
        hours: &[Vec<&Footprint>],
        stats: &mut BinningStats,
    ) -> Result<Vec<SparseTimestepResult>> {
        let threshold = self.config.spill_threshold_points;
        let mut accumulator = self.footprint_accumulator()?;
        let mut held: Vec<SparseTimestepResult> = Vec::new();
        let mut held_points = 0;
        let mut spill: Option<SpillWriter> = None;

        for group in hours.chunks(self.config.hours_per_period) {
            for hour in group {
                accumulator.regrid_footprints(hour.iter().copied());
            }
            let (timestep, period_stats) = accumulator.finish()?;
            *stats += period_stats;

            match spill.as_mut() {
                Some(writer) => writer.append(&timestep)?,
                None => {
                    held_points += timestep.len();
                    held.push(timestep);
                    if held_points > threshold {
                        tracing::info!(
                            points = held_points,
                            threshold,
                            "Spilling compacted timesteps to disk"
                        );
                        let mut writer = SpillWriter::new(self.grid.is_layered())?;
                        for timestep in held.drain(..) {
                            writer.append(&timestep)?;
                        }
                        spill = Some(writer);
                    }
                }
            }
        }

        let Some(writer) = spill else {
            return Ok(held);
        };

        let mut reader = writer.into_reader()?;
        let mut timesteps = Vec::with_capacity(reader.timestep_count());
        for index in 0..reader.timestep_count() {
            let mut timestep = reader.read_timestep(index)?;
            self.restore_layer_elevations(&mut timestep);
            timesteps.push(timestep);
        }
        Ok(timesteps)
    }

    /// Spill records omit elevations; layered cells get them back from the grid.
    fn restore_layer_elevations(&self, timestep: &mut SparseTimestepResult) {
        if let Some(layers) = &timestep.layers {
            timestep.elevations = Some(
                layers
                    .iter()
                    .map(|&layer| self.grid.layer_center_elevation(layer).unwrap_or(0.0))
                    .collect(),
            );
        }
    }
}

/// Split records into `ctx.hours()` hourly buckets. Records whose timestamp
/// is invalid or outside the window are dropped and counted.
pub fn partition_by_hour<'r, T>(
    ctx: &RegridContext,
    records: &'r [T],
    timestamp: impl Fn(&T) -> Timestamp,
) -> (Vec<Vec<&'r T>>, usize) {
    let mut hours: Vec<Vec<&T>> = vec![Vec::new(); ctx.hours()];
    let mut outside = 0;

    for record in records {
        match ctx.hour_index(timestamp(record)) {
            Some(hour) => hours[hour].push(record),
            None => outside += 1,
        }
    }

    if outside > 0 {
        tracing::warn!(
            skipped = outside,
            start = %ctx.start(),
            hours = ctx.hours(),
            "Records outside the time window were skipped"
        );
    }

    (hours, outside)
}

fn log_run(kind: &str, records: usize, stats: &BinningStats, series: &AggregatedSeries) {
    tracing::info!(
        kind,
        records,
        accepted = stats.accepted,
        skipped = stats.skipped(),
        invalid_geometry = stats.invalid_geometry,
        timesteps = series.timestep_count(),
        points = series.total_points(),
        "Regridding complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDefinition;
    use crate::types::AggregationMethod;
    use projection::Identity;
    use test_utils::{assert_approx_eq, fixtures, hour_timestamp, hourly_observations, square_footprint, TEST_START};

    fn small_grid() -> Grid {
        let g = fixtures::grid::SMALL_3X3;
        Grid::new(GridDefinition {
            columns: g.columns,
            rows: g.rows,
            west_edge: g.west_edge,
            south_edge: g.south_edge,
            cell_width: g.cell_width,
            cell_height: g.cell_height,
            vertical: None,
        })
        .unwrap()
    }

    fn context(hours: usize) -> RegridContext {
        RegridContext::new(Timestamp::new(TEST_START), hours).unwrap()
    }

    fn regridder(config: RegridConfig) -> Regridder<Identity> {
        Regridder::new(small_grid(), Identity, config).unwrap()
    }

    #[test]
    fn test_partition_by_hour() {
        let obs = vec![
            Observation::new(hour_timestamp(0, 59), 5.0, 5.0, 1.0),
            Observation::new(hour_timestamp(2, 0), 5.0, 5.0, 2.0),
            Observation::new(hour_timestamp(3, 0), 5.0, 5.0, 3.0),
            Observation::new(Timestamp::new(20231231230000), 5.0, 5.0, 4.0),
        ];
        let (hours, outside) = partition_by_hour(&context(3), &obs, |o| o.timestamp);
        assert_eq!(hours.len(), 3);
        assert_eq!(hours[0].len(), 1);
        assert!(hours[1].is_empty());
        assert_eq!(hours[2][0].value, 2.0);
        assert_eq!(outside, 2);
    }

    #[test]
    fn test_hourly_points() {
        let config = RegridConfig {
            minimum_valid_value: 0.0,
            ..Default::default()
        };
        let obs = hourly_observations(15.0, 15.0, &[1.0, 2.0, 3.0]);

        let outcome = regridder(config).regrid_points(&context(3), &obs).unwrap();

        assert_eq!(outcome.series.point_counts(), vec![1, 1, 1]);
        assert_eq!(outcome.series.hours_per_timestep, 1);
        assert_eq!(outcome.stats.accepted, 3);
        assert_eq!(outcome.series.timesteps[1].columns, vec![2]);
    }

    #[test]
    fn test_daily_points_parallel_matches_sequential() {
        let values: Vec<f64> = (1..=48).map(|v| v as f64).collect();
        let obs = hourly_observations(25.0, 5.0, &values);

        let run = |parallel| {
            let config = RegridConfig {
                minimum_valid_value: 0.0,
                hours_per_period: 24,
                parallel,
                ..Default::default()
            };
            regridder(config).regrid_points(&context(48), &obs).unwrap()
        };
        let parallel = run(true);
        let sequential = run(false);

        assert_eq!(parallel.series, sequential.series);
        let series = parallel.series;
        assert_eq!(series.point_counts(), vec![1, 1]);
        assert_eq!(series.timesteps[0].counts, vec![24]);
        assert_approx_eq!(series.timesteps[0].values[0], 12.5, 1e-12);
        assert_approx_eq!(series.timesteps[1].values[0], 36.5, 1e-12);
    }

    #[test]
    fn test_empty_run_is_distinguishable() {
        let outcome = regridder(RegridConfig::default())
            .regrid_points(&context(2), &[])
            .unwrap();
        assert_eq!(outcome.series.total_points(), 0);
        assert!(outcome.require_data().unwrap_err().is_empty_result());
    }

    #[test]
    fn test_footprints_weighted() {
        let config = RegridConfig {
            aggregation_method: AggregationMethod::Weighted,
            minimum_valid_value: 0.0,
            ..Default::default()
        };
        let footprints = vec![
            square_footprint(hour_timestamp(0, 10), 5.0, 5.0, 2.0, 4.0),
            square_footprint(hour_timestamp(1, 10), 15.0, 5.0, 2.0, 6.0),
        ];

        let outcome = regridder(config)
            .regrid_footprints(&context(2), &footprints)
            .unwrap();

        assert_eq!(outcome.series.point_counts(), vec![1, 1]);
        assert_approx_eq!(outcome.series.timesteps[0].values[0], 4.0, 1e-9);
        assert_eq!(outcome.series.timesteps[1].columns, vec![2]);
    }

    #[test]
    fn test_footprint_period_means_every_footprint() {
        // Three footprints of 1 in hour 0 and one of 5 in hour 1, all in cell (1, 1)
        let footprints = vec![
            square_footprint(hour_timestamp(0, 0), 5.0, 5.0, 1.0, 1.0),
            square_footprint(hour_timestamp(0, 10), 5.0, 5.0, 1.0, 1.0),
            square_footprint(hour_timestamp(0, 20), 5.0, 5.0, 1.0, 1.0),
            square_footprint(hour_timestamp(1, 0), 5.0, 5.0, 1.0, 5.0),
        ];

        for (parallel, spill_threshold_points) in [(true, 0), (false, 0), (false, 1)] {
            for method in [AggregationMethod::Mean, AggregationMethod::Weighted] {
                let config = RegridConfig {
                    aggregation_method: method,
                    minimum_valid_value: 0.0,
                    hours_per_period: 2,
                    parallel,
                    spill_threshold_points,
                };
                let outcome = regridder(config)
                    .regrid_footprints(&context(2), &footprints)
                    .unwrap();

                let series = outcome.series;
                assert_eq!(series.hours_per_timestep, 2);
                assert_eq!(series.point_counts(), vec![1]);
                let entry = series.timesteps[0].entry(0);
                assert_eq!((entry.column, entry.row), (1, 1));
                assert_eq!(entry.count, 4);
                assert_approx_eq!(entry.value, 2.0, 1e-12);
                assert_eq!(outcome.stats.accepted, 4);
            }
        }
    }

    #[test]
    fn test_footprint_partial_last_period() {
        let footprints: Vec<Footprint> = (0..5)
            .map(|hour| square_footprint(hour_timestamp(hour, 0), 15.0, 15.0, 1.0, hour as f64))
            .collect();
        let config = RegridConfig {
            minimum_valid_value: 0.0,
            hours_per_period: 3,
            ..Default::default()
        };

        let series = regridder(config)
            .regrid_footprints(&context(5), &footprints)
            .unwrap()
            .series;

        assert_eq!(series.timestep_count(), 2);
        assert_eq!(series.timesteps[0].counts, vec![3]);
        assert_approx_eq!(series.timesteps[0].values[0], 1.0, 1e-12);
        assert_eq!(series.timesteps[1].counts, vec![2]);
        assert_approx_eq!(series.timesteps[1].values[0], 3.5, 1e-12);
    }

    #[test]
    fn test_footprint_spill_matches_in_memory() {
        let footprints: Vec<Footprint> = (0..6)
            .flat_map(|hour| {
                [
                    square_footprint(hour_timestamp(hour, 0), 5.0, 5.0, 1.0, hour as f64 + 1.0),
                    square_footprint(hour_timestamp(hour, 30), 25.0, 15.0, 1.0, 2.0),
                ]
            })
            .collect();

        let run = |spill_threshold_points| {
            let config = RegridConfig {
                minimum_valid_value: 0.0,
                hours_per_period: 4,
                spill_threshold_points,
                ..Default::default()
            };
            regridder(config)
                .regrid_footprints(&context(6), &footprints)
                .unwrap()
        };

        let in_memory = run(0);
        let spilled = run(3);

        assert_eq!(spilled.series, in_memory.series);
        assert_eq!(spilled.stats, in_memory.stats);
        assert_eq!(spilled.series.point_counts(), vec![2, 2]);
        assert_approx_eq!(spilled.series.timesteps[0].values[0], 2.5, 1e-12);
    }
}
