//! Monthly analyte rollup, written on the first day of each month.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::export::{ExportError, RollupSink};
use crate::models::{MonthlyRollupRecord, TimeWindow};
use crate::stats::StatsService;
use crate::timestamp::format_instant;

#[derive(Error, Debug)]
pub enum HousekeepingError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// `YYYY-MM` partition name for `date`.
pub fn month_partition(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Month start 00:00:00 through the end of `today`.
pub fn month_to_date(today: NaiveDate) -> TimeWindow {
    let first = today.with_day(1).unwrap_or(today);
    TimeWindow::from_dates(first, today)
}

/// Count each code since the start of the month and write the partition.
///
/// Runs only on the 1st unless `force`. Counts honour the missing-draw
/// exclusions as of `now`. Returns the partition path, or `None` if skipped.
pub fn ensure_monthly_export(
    stats: &StatsService,
    sink: &dyn RollupSink,
    codes: &[String],
    now: &NaiveDateTime,
    force: bool,
) -> Result<Option<PathBuf>, HousekeepingError> {
    let today = now.date();
    if today.day() != 1 && !force {
        tracing::debug!(date = %today, "Not the first of the month, skipping rollup");
        return Ok(None);
    }

    let snapshot = stats.snapshot(now)?;
    let window = month_to_date(today);
    let created_at = format_instant(now);

    let records: Vec<MonthlyRollupRecord> = codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty())
        .map(|code| MonthlyRollupRecord {
            analyte_code: code.to_string(),
            count_since_month_start: snapshot.count_analyte_requests(code, &window),
            created_at: created_at.clone(),
        })
        .collect();

    let path = sink.write_month(&month_partition(today), &records)?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Arc;

    use rusqlite::Connection;

    use super::*;
    use crate::db::fixtures::*;
    use crate::db::SampleStore;
    use crate::export::CsvMonthlyExport;
    use crate::mapping::SchemaMapping;

    #[derive(Default)]
    struct MemoryRollup {
        written: RefCell<Vec<(String, Vec<MonthlyRollupRecord>)>>,
    }

    impl RollupSink for MemoryRollup {
        fn write_month(
            &self,
            partition: &str,
            records: &[MonthlyRollupRecord],
        ) -> Result<PathBuf, ExportError> {
            self.written
                .borrow_mut()
                .push((partition.to_string(), records.to_vec()));
            Ok(PathBuf::from(partition))
        }
    }

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn stats() -> (tempfile::TempDir, StatsService) {
        let (dir, path) = file_store();
        let conn = Connection::open(&path).unwrap();
        // Previous month: outside the window.
        seed_sample(&conn, "OLD", "2024-02-28 10:00:00", &[("NA", Some("1"))]);
        // Same day, resulted.
        seed_sample(&conn, "P1", "2024-03-01 01:00:00", &[("NA", Some("140")), ("K", None)]);
        // Open, but too young to be flagged.
        seed_sample(&conn, "P2", "2024-03-01 02:00:00", &[("NA", None), ("K", None)]);
        drop(conn);
        (dir, StatsService::new(SampleStore::new(path), Arc::new(SchemaMapping::lab_default())))
    }

    fn codes() -> Vec<String> {
        vec!["NA".into(), "K".into(), "GLU".into()]
    }

    #[test]
    fn skipped_unless_first_of_month() {
        let (_dir, svc) = stats();
        let sink = MemoryRollup::default();
        let out = ensure_monthly_export(&svc, &sink, &codes(), &at(3, 2, 6), false).unwrap();
        assert!(out.is_none());
        assert!(sink.written.borrow().is_empty());
    }

    #[test]
    fn first_of_month_counts_month_to_date() {
        let (_dir, svc) = stats();
        let sink = MemoryRollup::default();
        let out = ensure_monthly_export(&svc, &sink, &codes(), &at(3, 1, 6), false).unwrap();
        assert_eq!(out, Some(PathBuf::from("2024-03")));

        let written = sink.written.borrow();
        let (partition, records) = &written[0];
        assert_eq!(partition, "2024-03");
        let counts: Vec<_> = records
            .iter()
            .map(|r| (r.analyte_code.as_str(), r.count_since_month_start))
            .collect();
        assert_eq!(counts, vec![("NA", 2), ("K", 2), ("GLU", 0)]);
        assert!(records.iter().all(|r| r.created_at == "2024-03-01 06:00:00"));
    }

    #[test]
    fn forced_run_applies_exclusions() {
        let (_dir, svc) = stats();
        let sink = MemoryRollup::default();
        // Two days later P2 (two lines, nothing resulted) counts as a missing draw.
        ensure_monthly_export(&svc, &sink, &codes(), &at(3, 3, 6), true).unwrap();
        let written = sink.written.borrow();
        let na = written[0].1.iter().find(|r| r.analyte_code == "NA").unwrap();
        assert_eq!(na.count_since_month_start, 1);
    }

    #[test]
    fn rerun_rewrites_csv_partition() {
        let (dir, svc) = stats();
        let sink = CsvMonthlyExport::new(dir.path().join("export"));
        let first = ensure_monthly_export(&svc, &sink, &codes(), &at(3, 1, 6), false)
            .unwrap()
            .unwrap();
        let second = ensure_monthly_export(&svc, &sink, &codes(), &at(3, 1, 7), false)
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
        let raw = std::fs::read_to_string(&second).unwrap();
        assert_eq!(raw.lines().count(), 4);
        assert!(raw.contains("2024-03-01 07:00:00"));
    }

    #[test]
    fn window_starts_at_month_start() {
        let w = month_to_date(NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());
        assert_eq!(w.start, at(3, 1, 0));
        assert_eq!(month_partition(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()), "2024-12");
    }
}
