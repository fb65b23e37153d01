//! Per-analyte request counts.
//!
//! Two window-bounded variants exist on purpose: the batch count behind the
//! counts report ignores the missing-draw exclusions, while the single-code
//! count used by the monthly rollup honours them.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use crate::models::{AnalyteCount, SampleRecord, TimeWindow};

use super::exclusion::ExclusionSet;

fn requested(codes: &[String]) -> BTreeSet<&str> {
    codes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect()
}

fn to_counts(tally: BTreeMap<&str, u64>) -> Vec<AnalyteCount> {
    tally
        .into_iter()
        .map(|(code, count)| AnalyteCount {
            code: code.to_string(),
            count,
        })
        .collect()
}

/// Catalogue codes minus the user-excluded set, sorted.
pub fn included_analytes(all: &[String], excluded: &BTreeSet<String>) -> Vec<String> {
    let mut codes: Vec<String> = all
        .iter()
        .filter(|code| !excluded.contains(code.trim()))
        .cloned()
        .collect();
    codes.sort();
    codes.dedup();
    codes
}

/// Requirement rows per requested code for samples ordered within `window`.
/// Every requested code is reported, zero included. No exclusions.
pub fn count_requests(
    samples: &[SampleRecord],
    codes: &[String],
    window: &TimeWindow,
) -> Vec<AnalyteCount> {
    let wanted = requested(codes);
    let mut tally: BTreeMap<&str, u64> = wanted.iter().map(|c| (*c, 0)).collect();

    for sample in samples.iter().filter(|s| s.ordered_within(window)) {
        for line in &sample.lines {
            if let Some(n) = tally.get_mut(line.analyte.as_str()) {
                *n += 1;
            }
        }
    }
    to_counts(tally)
}

/// Requirement rows for one code within `window`, skipping excluded samples.
pub fn count_analyte_requests(
    samples: &[SampleRecord],
    code: &str,
    window: &TimeWindow,
    exclusions: &ExclusionSet,
) -> u64 {
    let code = code.trim();
    samples
        .iter()
        .filter(|s| s.ordered_within(window) && !exclusions.contains(&s.id))
        .flat_map(|s| s.lines.iter())
        .filter(|l| l.analyte == code)
        .count() as u64
}

/// Open requirement rows per requested code for samples ordered at or after
/// `since`, skipping excluded samples.
pub fn count_open_since(
    samples: &[SampleRecord],
    codes: &[String],
    since: &NaiveDateTime,
    exclusions: &ExclusionSet,
) -> Vec<AnalyteCount> {
    let wanted = requested(codes);
    let mut tally: BTreeMap<&str, u64> = wanted.iter().map(|c| (*c, 0)).collect();

    for sample in samples
        .iter()
        .filter(|s| s.ordered_since(since) && !exclusions.contains(&s.id))
    {
        for line in sample.lines.iter().filter(|l| l.is_open()) {
            if let Some(n) = tally.get_mut(line.analyte.as_str()) {
                *n += 1;
            }
        }
    }
    to_counts(tally)
}
