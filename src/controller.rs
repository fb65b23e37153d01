//! Application controller: settings, schema mapping and store wired together
//! behind the operations the shell exposes.
//!
//! Read operations collapse an unavailable store to empty results so every
//! view stays usable. Mutations surface their errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::{self, Settings, SettingsError};
use crate::db::{DatabaseError, OrEmpty, SampleStore};
use crate::deletion;
use crate::export::{CsvAuditLog, CsvMonthlyExport};
use crate::housekeeping::{self, HousekeepingError};
use crate::mapping::{MappingError, SchemaMapping};
use crate::models::{
    AnalyteCount, ComboStats, CountsReport, PathKey, StatusFilter, SuspectedSample, TimeWindow,
};
use crate::stats::{self, StatsService, StatsSnapshot};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Housekeeping(#[from] HousekeepingError),
}

pub struct LabController {
    settings_path: PathBuf,
    settings: Settings,
    stats: StatsService,
}

impl LabController {
    /// Load settings and the schema mapping. A broken mapping is fatal.
    pub fn new(settings_path: &Path, mapping_path: &Path) -> Result<Self, ControllerError> {
        let settings = Settings::load(settings_path)?;
        let mapping = Arc::new(SchemaMapping::load(mapping_path)?);
        Ok(Self::with_mapping(settings_path, settings, mapping))
    }

    pub fn with_mapping(settings_path: &Path, settings: Settings, mapping: Arc<SchemaMapping>) -> Self {
        let store = store_for(settings_path, &settings);
        if store.path().is_some() && !store.is_available() {
            tracing::warn!(
                path = %settings.paths.database_path,
                "Configured sample store does not exist"
            );
        }
        Self {
            settings_path: settings_path.to_path_buf(),
            settings,
            stats: StatsService::new(store, mapping),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &SampleStore {
        self.stats.store()
    }

    fn base_dir(&self) -> PathBuf {
        base_dir(&self.settings_path)
    }

    pub fn audit_path(&self) -> PathBuf {
        config::resolve_against(&self.base_dir(), &self.settings.paths.audit_file)
    }

    pub fn export_dir(&self) -> PathBuf {
        config::resolve_against(&self.base_dir(), &self.settings.paths.export_dir)
    }

    fn snapshot(&self, now: &NaiveDateTime) -> StatsSnapshot {
        self.stats.snapshot(now).or_empty()
    }

    // ═══════════════════════════════════════════
    // Analyte catalogue
    // ═══════════════════════════════════════════

    pub fn list_all_analytes(&self) -> Vec<String> {
        self.stats.list_all_analytes().or_empty()
    }

    pub fn excluded_analytes(&self) -> Vec<String> {
        self.settings.filters.exclude_analytes.iter().cloned().collect()
    }

    pub fn update_excluded_analytes<I, S>(&mut self, items: I) -> Result<(), ControllerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.settings.set_excluded_analytes(items);
        self.settings.save(&self.settings_path)?;
        tracing::info!(
            excluded = self.settings.filters.exclude_analytes.len(),
            "Updated excluded analytes"
        );
        Ok(())
    }

    pub fn included_analytes(&self) -> Vec<String> {
        stats::included_analytes(&self.list_all_analytes(), &self.settings.filters.exclude_analytes)
    }

    /// Explicit codes win; otherwise the included catalogue.
    fn codes_or_included(&self, analytes: &[String]) -> Vec<String> {
        let explicit: Vec<String> = analytes
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if explicit.is_empty() {
            self.included_analytes()
        } else {
            explicit
        }
    }

    // ═══════════════════════════════════════════
    // Reports
    // ═══════════════════════════════════════════

    /// Analyte counts, status counts and weekday stats over one snapshot.
    pub fn counts_report(
        &self,
        window: &TimeWindow,
        analytes: &[String],
        weekday_status: StatusFilter,
        weekday_analyte: Option<&str>,
        now: &NaiveDateTime,
    ) -> CountsReport {
        let codes = self.codes_or_included(analytes);
        let snapshot = self.snapshot(now);

        CountsReport {
            analyte_counts: snapshot.count_requests(&codes, window),
            status: snapshot.counts_by_status(window),
            weekdays: snapshot.weekday_report(window, weekday_status, weekday_analyte),
        }
    }

    pub fn open_counts_since(
        &self,
        analytes: &[String],
        since: &NaiveDateTime,
        now: &NaiveDateTime,
    ) -> Vec<AnalyteCount> {
        let codes = self.codes_or_included(analytes);
        self.snapshot(now).count_open_since(&codes, since)
    }

    pub fn suspected_missing_draw(&self, now: &NaiveDateTime) -> Vec<SuspectedSample> {
        self.snapshot(now).suspected()
    }

    /// `top == 0` keeps every combination.
    pub fn combo_stats_since(&self, since: &NaiveDateTime, max_k: usize, top: usize) -> ComboStats {
        let all = self.stats.combo_stats(since, max_k).or_empty();
        stats::truncate_top(all, top)
    }

    // ═══════════════════════════════════════════
    // Mutations
    // ═══════════════════════════════════════════

    pub fn delete_samples_with_audit(
        &self,
        sample_ids: &[String],
        now: &NaiveDateTime,
    ) -> Result<usize, ControllerError> {
        let audit = CsvAuditLog::new(self.audit_path());
        let removed = deletion::delete_samples_with_audit(
            self.stats.store(),
            self.stats.mapping(),
            &audit,
            sample_ids,
            now,
        )?;
        Ok(removed)
    }

    /// Monthly rollup of the included analytes.
    pub fn monthly_export_if_first(
        &self,
        now: &NaiveDateTime,
        force: bool,
    ) -> Result<Option<PathBuf>, ControllerError> {
        let sink = CsvMonthlyExport::new(self.export_dir());
        let codes = self.included_analytes();
        Ok(housekeeping::ensure_monthly_export(
            &self.stats,
            &sink,
            &codes,
            now,
            force,
        )?)
    }

    pub fn set_path(&mut self, key: PathKey, value: &str) -> Result<(), ControllerError> {
        let value = value.trim().to_string();
        match key {
            PathKey::Database => self.settings.paths.database_path = value,
            PathKey::AuditFile => self.settings.paths.audit_file = value,
            PathKey::ExportDir => self.settings.paths.export_dir = value,
        }
        self.settings.save(&self.settings_path)?;
        if key == PathKey::Database {
            self.stats = self
                .stats
                .with_store(store_for(&self.settings_path, &self.settings));
        }
        tracing::info!(key = %key, "Updated configured path");
        Ok(())
    }
}

fn base_dir(settings_path: &Path) -> PathBuf {
    settings_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn store_for(settings_path: &Path, settings: &Settings) -> SampleStore {
    let configured = settings.paths.database_path.trim();
    if configured.is_empty() {
        return SampleStore::unconfigured();
    }
    SampleStore::new(config::resolve_against(&base_dir(settings_path), configured))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::Connection;

    use super::*;
    use crate::db::fixtures::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn march() -> TimeWindow {
        TimeWindow::from_dates(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    /// Settings next to the store; database path relative to them.
    fn controller() -> (tempfile::TempDir, LabController) {
        let (dir, db_path) = file_store();
        let conn = Connection::open(&db_path).unwrap();
        seed_sample(&conn, "P1", "2024-03-04 08:00:00", &[("NA", None), ("K", None)]);
        seed_sample(&conn, "P2", "2024-03-05 08:00:00", &[("NA", Some("140")), ("CRP", None)]);
        seed_sample(&conn, "P3", "2024-03-06 08:00:00", &[("K", Some("4.0"))]);
        drop(conn);

        let settings_path = dir.path().join(config::SETTINGS_FILE);
        let mut settings = Settings::default();
        settings.paths.database_path = "lab.db".into();
        settings.save(&settings_path).unwrap();

        let mapping_path = dir.path().join(config::MAPPING_FILE);
        std::fs::write(
            &mapping_path,
            r#"{
                "header_table": "Befund",
                "line_table": "BefTag",
                "join_key": "ProbenNr",
                "order_timestamp_columns": ["AbnahmeDatum", "TimeStamp"],
                "analyte_column": "TestKB",
                "result_column": "Ergebnis"
            }"#,
        )
        .unwrap();

        let ctl = LabController::new(&settings_path, &mapping_path).unwrap();
        (dir, ctl)
    }

    #[test]
    fn broken_mapping_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let mapping_path = dir.path().join(config::MAPPING_FILE);
        std::fs::write(&mapping_path, r#"{ "header_table": "Befund" }"#).unwrap();
        let result = LabController::new(&dir.path().join("settings.json"), &mapping_path);
        assert!(matches!(result, Err(ControllerError::Mapping(_))));
    }

    #[test]
    fn exclusion_filter_shapes_included_codes() {
        let (dir, mut ctl) = controller();
        assert_eq!(ctl.list_all_analytes(), vec!["CRP", "K", "NA"]);

        ctl.update_excluded_analytes(["K"]).unwrap();
        assert_eq!(ctl.included_analytes(), vec!["CRP", "NA"]);

        let reloaded = Settings::load(&dir.path().join(config::SETTINGS_FILE)).unwrap();
        assert!(reloaded.filters.exclude_analytes.contains("K"));
    }

    #[test]
    fn counts_report_uses_included_codes_when_none_given() {
        let (_dir, mut ctl) = controller();
        ctl.update_excluded_analytes(["CRP"]).unwrap();
        let report = ctl.counts_report(&march(), &[], StatusFilter::All, None, &at(10, 12));

        let codes: Vec<_> = report.analyte_counts.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["K", "NA"]);
        // P1 is a missing draw by the 10th; the batch count still sees it.
        assert_eq!(report.analyte_counts[1].count, 2);
        assert_eq!(report.status.all, 2);
        assert_eq!(report.weekdays.total(), 2);
        assert!(report.weekdays.overall_average.is_some());
    }

    #[test]
    fn open_counts_apply_exclusions() {
        let (_dir, ctl) = controller();
        let counts = ctl.open_counts_since(&["NA".into(), "CRP".into()], &at(1, 0), &at(10, 12));
        assert_eq!(counts[0].code, "CRP");
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].count, 0);
    }

    #[test]
    fn delete_writes_audit_log() {
        let (_dir, ctl) = controller();
        let suspects = ctl.suspected_missing_draw(&at(10, 12));
        assert_eq!(suspects.len(), 1);

        let ids: Vec<String> = suspects.into_iter().map(|s| s.sample_id).collect();
        assert_eq!(ctl.delete_samples_with_audit(&ids, &at(10, 12)).unwrap(), 3);
        assert!(ctl.audit_path().is_file());
        assert!(ctl.suspected_missing_draw(&at(10, 12)).is_empty());
    }

    #[test]
    fn combos_are_truncated() {
        let (_dir, ctl) = controller();
        let stats = ctl.combo_stats_since(&at(1, 0), 4, 1);
        assert_eq!(stats.buckets.len(), 4);
        assert_eq!(stats.bucket(1).unwrap().entries.len(), 1);
        assert_eq!(stats.bucket(2).unwrap().entries[0].key, "K + NA");
    }

    #[test]
    fn monthly_export_lands_in_export_dir() {
        let (dir, ctl) = controller();
        let first = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let path = ctl.monthly_export_if_first(&first, false).unwrap().unwrap();
        assert!(path.starts_with(dir.path().join("export")));
        assert!(ctl.monthly_export_if_first(&at(2, 6), false).unwrap().is_none());
    }

    #[test]
    fn unset_database_reads_empty() {
        let (_dir, mut ctl) = controller();
        ctl.set_path(PathKey::Database, "").unwrap();
        assert!(!ctl.store().is_available());
        assert!(ctl.list_all_analytes().is_empty());
        assert!(ctl.suspected_missing_draw(&at(10, 12)).is_empty());
        assert!(ctl.delete_samples_with_audit(&["P1".into()], &at(10, 12)).is_err());
    }
}
