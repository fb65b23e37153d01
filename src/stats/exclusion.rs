//! Suspected missing blood draw: samples ordered more than a day ago with
//! several requested analytes and not a single result.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::models::{SampleId, SampleRecord, SuspectedSample};

/// Snapshot of flagged sample ids. Recompute per call; "now" moves.
pub type ExclusionSet = HashSet<SampleId>;

/// Age threshold in fractional days. Strictly greater-than.
pub const MISSING_DRAW_AGE_DAYS: f64 = 1.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Age of the order at `reference`, in fractional days.
fn age_days(order: &NaiveDateTime, reference: &NaiveDateTime) -> f64 {
    (*reference - *order).num_milliseconds() as f64 / MILLIS_PER_DAY
}

pub fn is_suspected_missing_draw(sample: &SampleRecord, reference: &NaiveDateTime) -> bool {
    let Some(order) = sample.order_instant else {
        return false;
    };
    sample.lines.len() > 1
        && sample.done_count() == 0
        && age_days(&order, reference) > MISSING_DRAW_AGE_DAYS
}

pub fn compute_exclusions(samples: &[SampleRecord], reference: &NaiveDateTime) -> ExclusionSet {
    let set: ExclusionSet = samples
        .iter()
        .filter(|s| is_suspected_missing_draw(s, reference))
        .map(|s| s.id.clone())
        .collect();
    tracing::debug!(excluded = set.len(), "Computed missing-draw exclusions");
    set
}

/// Flagged samples as records, oldest order first.
pub fn list_suspected(samples: &[SampleRecord], reference: &NaiveDateTime) -> Vec<SuspectedSample> {
    let mut rows: Vec<SuspectedSample> = samples
        .iter()
        .filter(|s| is_suspected_missing_draw(s, reference))
        .filter_map(|s| {
            Some(SuspectedSample {
                sample_id: s.id.clone(),
                order_instant: s.order_instant?,
                line_count: s.lines.len(),
                analytes: s.analytes().into_iter().collect::<Vec<_>>().join(", "),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.order_instant
            .cmp(&b.order_instant)
            .then_with(|| a.sample_id.cmp(&b.sample_id))
    });
    rows
}
