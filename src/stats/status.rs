use crate::models::{SampleRecord, SampleStatus, StatusCounts, TimeWindow};

use super::exclusion::ExclusionSet;

/// Tally samples ordered within `window` as open or done.
///
/// Samples in `exclusions`, samples without a parseable order time, and
/// samples without lines are left out of all three counts.
pub fn counts_by_status(
    samples: &[SampleRecord],
    window: &TimeWindow,
    exclusions: &ExclusionSet,
) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for sample in samples {
        if !sample.ordered_within(window) || exclusions.contains(&sample.id) {
            continue;
        }
        match sample.status() {
            Some(SampleStatus::Open) => counts.open += 1,
            Some(SampleStatus::Done) => counts.done += 1,
            None => {}
        }
    }
    counts.all = counts.open + counts.done;
    counts
}
