//! Merging consecutive hourly timesteps into coarser periods.

use std::collections::HashMap;

use regrid_common::MISSING_VALUE;

use crate::error::{RegridError, Result};
use crate::types::{
    AggregatedSeries, CellKey, FlatSeries, SparseEntry, SparseLayout, SparseTimestepResult,
    TemporalSummary,
};

/// Running merge of one cell within a period. Representative fields come from
/// the first entry seen for the cell.
struct MergedCell {
    first: SparseEntry,
    sum: f64,
    sum2: f64,
    count: usize,
}

/// Merge `timesteps` into groups of `hours_per_period` consecutive timesteps.
///
/// Each group emits one entry per distinct cell seen in any of its timesteps,
/// with value (and value2) = mean over the contributing entries and count =
/// the number of contributing entries. Entries are emitted in first-occurrence
/// order. The last group may be shorter. Entries holding `MISSING_VALUE` are
/// ignored. A group without entries yields an empty timestep.
pub fn aggregate(
    hours_per_period: usize,
    timesteps: &[SparseTimestepResult],
) -> Result<AggregatedSeries> {
    if hours_per_period == 0 {
        return Err(RegridError::invalid_config("hours_per_period must be > 0"));
    }
    for timestep in timesteps {
        timestep.validate()?;
    }

    let layout = SparseLayout::common(timesteps);
    let mut output = Vec::with_capacity(timesteps.len().div_ceil(hours_per_period));

    for (group_index, group) in timesteps.chunks(hours_per_period).enumerate() {
        let merged = merge_group(group, layout);
        tracing::debug!(
            group = group_index,
            hours = group.len(),
            cells = merged.len(),
            "Merged period"
        );
        output.push(merged);
    }

    let series = AggregatedSeries::new(output, hours_per_period);
    let TemporalSummary {
        new_timestep_count,
        total_output_points,
    } = series.summary();
    tracing::info!(
        input_timesteps = timesteps.len(),
        hours_per_period,
        new_timestep_count,
        total_output_points,
        "Temporal aggregation complete"
    );

    Ok(series)
}

/// [`aggregate`] over the flat form: per-timestep counts followed by
/// concatenated parallel arrays.
pub fn aggregate_flat(
    hours_per_period: usize,
    input: FlatSeries,
) -> Result<(FlatSeries, TemporalSummary)> {
    let timesteps = input.into_timesteps()?;
    let series = aggregate(hours_per_period, &timesteps)?;
    let summary = series.summary();
    Ok((FlatSeries::from_timesteps(&series.timesteps)?, summary))
}

fn merge_group(group: &[SparseTimestepResult], layout: SparseLayout) -> SparseTimestepResult {
    let mut index: HashMap<CellKey, usize> = HashMap::new();
    let mut cells: Vec<MergedCell> = Vec::new();

    for timestep in group {
        for entry in timestep.iter() {
            if entry.value == MISSING_VALUE || !entry.value.is_finite() {
                continue;
            }

            let slot = *index.entry(entry.key()).or_insert_with(|| {
                cells.push(MergedCell {
                    first: entry.clone(),
                    sum: 0.0,
                    sum2: 0.0,
                    count: 0,
                });
                cells.len() - 1
            });

            let cell = &mut cells[slot];
            cell.sum += entry.value;
            cell.sum2 += entry.value2.unwrap_or(0.0);
            cell.count += 1;
        }
    }

    let mut merged = SparseTimestepResult::with_layout(layout, cells.len());
    for cell in cells {
        let count = cell.count as f64;
        merged.push(&SparseEntry {
            value: cell.sum / count,
            value2: layout.values2.then(|| cell.sum2 / count),
            count: cell.count,
            ..cell.first
        });
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn entry(column: usize, row: usize, value: f64) -> SparseEntry {
        SparseEntry {
            column,
            row,
            layer: None,
            longitude: -90.0 + column as f64,
            latitude: 30.0 + row as f64,
            elevation: None,
            value,
            value2: None,
            count: 1,
            note: None,
        }
    }

    fn timestep(entries: &[SparseEntry]) -> SparseTimestepResult {
        let layout = entries.first().map(|e| SparseLayout {
            layers: e.layer.is_some(),
            elevations: e.elevation.is_some(),
            values2: e.value2.is_some(),
            notes: e.note.is_some(),
        });
        let mut result = SparseTimestepResult::with_layout(layout.unwrap_or_default(), entries.len());
        for e in entries {
            result.push(e);
        }
        result
    }

    #[test]
    fn test_merge_k_hours_of_one_cell() {
        for k in [1usize, 2, 5, 24] {
            let hours: Vec<_> = (1..=k).map(|v| timestep(&[entry(5, 5, v as f64)])).collect();

            let series = aggregate(k, &hours).unwrap();

            assert_eq!(series.timestep_count(), 1);
            let merged = &series.timesteps[0];
            assert_eq!(merged.len(), 1);
            assert_eq!((merged.columns[0], merged.rows[0]), (5, 5));
            assert_eq!(merged.counts[0], k);
            let expected = (1..=k).sum::<usize>() as f64 / k as f64;
            assert_approx_eq!(merged.values[0], expected, 1e-12);
        }
    }

    #[test]
    fn test_partial_last_group() {
        let hours: Vec<_> = (0..5).map(|v| timestep(&[entry(1, 1, v as f64)])).collect();

        let series = aggregate(2, &hours).unwrap();

        assert_eq!(series.timestep_count(), 3);
        assert_eq!(series.point_counts(), vec![1, 1, 1]);
        assert_eq!(series.timesteps[2].values, vec![4.0]);
        assert_eq!(series.timesteps[2].counts, vec![1]);
    }

    #[test]
    fn test_cell_in_one_hour_is_kept_in_first_occurrence_order() {
        let hours = vec![
            timestep(&[entry(3, 3, 1.0)]),
            timestep(&[entry(1, 1, 2.0), entry(3, 3, 3.0)]),
            SparseTimestepResult::default(),
        ];

        let series = aggregate(3, &hours).unwrap();
        let merged = &series.timesteps[0];

        assert_eq!(merged.columns, vec![3, 1]);
        assert_eq!(merged.values, vec![2.0, 2.0]);
        assert_eq!(merged.counts, vec![2, 1]);
        assert_eq!(merged.longitudes, vec![-87.0, -89.0]);
    }

    #[test]
    fn test_empty_groups_are_not_errors() {
        let hours = vec![
            SparseTimestepResult::default(),
            SparseTimestepResult::default(),
            timestep(&[entry(2, 2, 1.0)]),
        ];

        let series = aggregate(2, &hours).unwrap();

        assert_eq!(series.point_counts(), vec![0, 1]);
        assert_eq!(
            series.summary(),
            TemporalSummary {
                new_timestep_count: 2,
                total_output_points: 1
            }
        );
    }

    #[test]
    fn test_no_input() {
        let series = aggregate(24, &[]).unwrap();
        assert_eq!(series.timestep_count(), 0);
        assert!(series.require_data().unwrap_err().is_empty_result());
    }

    #[test]
    fn test_zero_hours_per_period_rejected() {
        assert!(matches!(
            aggregate(0, &[]),
            Err(RegridError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let hours = vec![
            timestep(&[entry(1, 1, MISSING_VALUE)]),
            timestep(&[entry(1, 1, 6.0)]),
        ];
        let series = aggregate(2, &hours).unwrap();
        assert_eq!(series.timesteps[0].values, vec![6.0]);
        assert_eq!(series.timesteps[0].counts, vec![1]);
    }

    #[test]
    fn test_value2_and_notes_merge() {
        let mut a = entry(1, 1, 2.0);
        a.value2 = Some(10.0);
        a.note = Some("first".to_string());
        let mut b = entry(1, 1, 4.0);
        b.value2 = Some(20.0);
        b.note = Some("second".to_string());

        let series = aggregate(2, &[timestep(&[a]), timestep(&[b])]).unwrap();
        let merged = series.timesteps[0].entry(0);

        assert_eq!(merged.value, 3.0);
        assert_eq!(merged.value2, Some(15.0));
        assert_eq!(merged.note.as_deref(), Some("first"));
    }

    #[test]
    fn test_aggregate_flat() {
        let hours = vec![
            timestep(&[entry(1, 1, 1.0), entry(2, 1, 5.0)]),
            timestep(&[entry(1, 1, 3.0)]),
            timestep(&[entry(4, 4, 8.0)]),
        ];
        let flat = FlatSeries::from_timesteps(&hours).unwrap();

        let (merged, summary) = aggregate_flat(2, flat).unwrap();

        assert_eq!(merged.point_counts, vec![2, 1]);
        assert_eq!(merged.points.values, vec![2.0, 5.0, 8.0]);
        assert_eq!(summary.total_output_points, 3);
        assert_eq!(summary.new_timestep_count, 2);
    }

    #[test]
    fn test_aggregate_flat_rejects_mismatched_counts() {
        let flat = FlatSeries {
            point_counts: vec![3],
            points: timestep(&[entry(1, 1, 1.0)]),
        };
        assert!(matches!(
            aggregate_flat(1, flat),
            Err(RegridError::InvalidInput(_))
        ));
    }
}
