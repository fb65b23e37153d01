//! Weekday buckets (0 = Monday … 6 = Sunday) with per-weekday averages.
//!
//! The average divides by how often each weekday actually occurs in the
//! queried date range, found by walking every calendar date in it.

use chrono::{Datelike, NaiveDate};

use crate::models::{
    round2, status_of, SampleRecord, StatusFilter, TimeWindow, WeekdayReport, WeekdayStat,
    WEEKDAY_LABELS,
};

use super::exclusion::ExclusionSet;

/// Monday-based weekday index.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Occurrences of each weekday between the window's start and end dates.
pub fn weekday_occurrences(window: &TimeWindow) -> [u32; 7] {
    let mut days = [0u32; 7];
    for date in window.dates() {
        days[weekday_index(date)] += 1;
    }
    days
}

/// Samples per weekday of their order instant.
///
/// With `analyte`, only that code's lines are considered, and samples
/// without such a line drop out. The status filter is applied per sample on
/// the considered lines.
pub fn weekday_counts(
    samples: &[SampleRecord],
    window: &TimeWindow,
    status: StatusFilter,
    analyte: Option<&str>,
    exclusions: &ExclusionSet,
) -> [u64; 7] {
    let analyte = analyte.map(str::trim).filter(|a| !a.is_empty());
    let mut counts = [0u64; 7];

    for sample in samples {
        let Some(order) = sample.order_instant else {
            continue;
        };
        if !window.contains(&order) || exclusions.contains(&sample.id) {
            continue;
        }
        let considered = sample
            .lines
            .iter()
            .filter(|l| analyte.map_or(true, |code| l.analyte == code));
        let Some(sample_status) = status_of(considered) else {
            continue;
        };
        if status.accepts(sample_status) {
            counts[weekday_index(order.date())] += 1;
        }
    }
    counts
}

/// Counts plus occurrence-normalized averages. The legacy overall average
/// (`sum / 7`) is only reported without an analyte filter.
pub fn weekday_report(
    samples: &[SampleRecord],
    window: &TimeWindow,
    status: StatusFilter,
    analyte: Option<&str>,
    exclusions: &ExclusionSet,
) -> WeekdayReport {
    let counts = weekday_counts(samples, window, status, analyte, exclusions);
    let occurrences = weekday_occurrences(window);

    let days = (0..7)
        .map(|i| WeekdayStat {
            weekday: i as u8,
            label: WEEKDAY_LABELS[i],
            count: counts[i],
            days: occurrences[i],
            average: round2(counts[i] as f64 / f64::from(occurrences[i].max(1))),
        })
        .collect();

    let filtered = analyte.is_some_and(|a| !a.trim().is_empty());
    let overall_average =
        (!filtered).then(|| round2(counts.iter().sum::<u64>() as f64 / 7.0));

    WeekdayReport {
        days,
        overall_average,
    }
}
