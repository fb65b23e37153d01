//! Exact-size open-analyte combinations.
//!
//! Missing-draw exclusions are never applied here: dropping a sample would
//! hide a real multi-analyte order rather than shrink it.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{ComboBucket, ComboEntry, ComboStats, SampleRecord};

pub const MIN_COMBO_SIZE: usize = 1;
pub const MAX_COMBO_SIZE: usize = 4;

pub const COMBO_SEPARATOR: &str = " + ";

/// Buckets for sizes `1..=max_k`, each holding the exact open-analyte sets of
/// that size among samples ordered at or after `since`.
///
/// `max_k` is clamped to `1..=4`. Every size gets a bucket, even when empty.
pub fn combo_stats(samples: &[SampleRecord], since: &NaiveDateTime, max_k: usize) -> ComboStats {
    let max_k = max_k.clamp(MIN_COMBO_SIZE, MAX_COMBO_SIZE);
    let mut tallies: Vec<HashMap<String, u64>> = vec![HashMap::new(); max_k];

    for sample in samples
        .iter()
        .filter(|s| !s.lines.is_empty() && s.ordered_since(since))
    {
        let open = sample.open_analytes();
        let size = open.len();
        if size < MIN_COMBO_SIZE || size > max_k {
            continue;
        }
        let key = open.into_iter().collect::<Vec<_>>().join(COMBO_SEPARATOR);
        *tallies[size - 1].entry(key).or_insert(0) += 1;
    }

    let buckets = tallies
        .into_iter()
        .enumerate()
        .map(|(i, tally)| {
            let mut entries: Vec<ComboEntry> = tally
                .into_iter()
                .map(|(key, count)| ComboEntry { key, count })
                .collect();
            entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
            ComboBucket {
                size: i + 1,
                entries,
            }
        })
        .collect();

    ComboStats { buckets }
}

/// Keep the `top` most frequent entries per bucket. Zero keeps everything.
pub fn truncate_top(mut stats: ComboStats, top: usize) -> ComboStats {
    if top > 0 {
        for bucket in &mut stats.buckets {
            bucket.entries.truncate(top);
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::SampleLine;
    use crate::timestamp::RawValue;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(7, 45, 0)
            .unwrap()
    }

    fn open_sample(id: &str, day: u32, codes: &[&str]) -> SampleRecord {
        SampleRecord {
            id: id.into(),
            order_instant: Some(at(day)),
            lines: codes
                .iter()
                .map(|c| SampleLine::new(*c, RawValue::Null))
                .collect(),
        }
    }

    fn keys(stats: &ComboStats, size: usize) -> Vec<(&str, u64)> {
        stats
            .bucket(size)
            .map(|b| b.entries.iter().map(|e| (e.key.as_str(), e.count)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn pair_lands_only_in_size_two() {
        let stats = combo_stats(&[open_sample("P1", 10, &["B", "A"])], &at(1), 3);
        assert!(keys(&stats, 1).is_empty());
        assert_eq!(keys(&stats, 2), vec![("A + B", 1)]);
        assert!(keys(&stats, 3).is_empty());
    }

    #[test]
    fn duplicate_codes_collapse() {
        let samples = vec![
            open_sample("P1", 10, &["A", "B", "A"]),
            open_sample("P2", 10, &["A", "B"]),
        ];
        let stats = combo_stats(&samples, &at(1), 4);
        assert_eq!(keys(&stats, 2), vec![("A + B", 2)]);
        assert!(keys(&stats, 3).is_empty());
    }

    #[test]
    fn done_lines_do_not_count() {
        let mut sample = open_sample("P1", 10, &["A", "B"]);
        sample.lines.push(SampleLine::new("C", RawValue::from("5.0")));
        let stats = combo_stats(&[sample], &at(1), 4);
        assert_eq!(keys(&stats, 2), vec![("A + B", 1)]);
    }

    #[test]
    fn oversized_and_empty_sets_are_dropped() {
        let mut done = open_sample("P2", 10, &[]);
        done.lines.push(SampleLine::new("A", RawValue::from("1")));
        let samples = vec![open_sample("P1", 10, &["A", "B", "C"]), done];
        let stats = combo_stats(&samples, &at(1), 2);
        assert_eq!(stats.buckets.len(), 2);
        assert!(stats.buckets.iter().all(|b| b.entries.is_empty()));
    }

    #[test]
    fn since_is_inclusive_and_filters_older() {
        let samples = vec![
            open_sample("P1", 5, &["A"]),
            open_sample("P2", 4, &["A"]),
        ];
        let stats = combo_stats(&samples, &at(5), 1);
        assert_eq!(keys(&stats, 1), vec![("A", 1)]);
    }

    #[test]
    fn sorted_by_count_then_key() {
        let samples = vec![
            open_sample("P1", 10, &["K"]),
            open_sample("P2", 10, &["NA"]),
            open_sample("P3", 10, &["NA"]),
            open_sample("P4", 10, &["CRP"]),
        ];
        let stats = combo_stats(&samples, &at(1), 1);
        assert_eq!(keys(&stats, 1), vec![("NA", 2), ("CRP", 1), ("K", 1)]);
    }

    #[test]
    fn max_k_is_clamped() {
        let samples = vec![open_sample("P1", 10, &["A", "B", "C", "D", "E"])];
        assert_eq!(combo_stats(&samples, &at(1), 9).buckets.len(), 4);
        assert_eq!(combo_stats(&samples, &at(1), 0).buckets.len(), 1);
    }

    #[test]
    fn truncate_keeps_leading_entries() {
        let samples: Vec<_> = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, c)| open_sample(&format!("P{i}"), 10, &[*c]))
            .collect();
        let stats = truncate_top(combo_stats(&samples, &at(1), 1), 2);
        assert_eq!(keys(&stats, 1), vec![("A", 1), ("B", 1)]);

        let all = truncate_top(combo_stats(&samples, &at(1), 1), 0);
        assert_eq!(keys(&all, 1).len(), 3);
    }
}
