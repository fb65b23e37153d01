//! Aggregations over the sample store.
//!
//! The functions in the submodules are pure over a loaded sample set.
//! `StatsService` binds them to a store and a schema mapping. Each call loads
//! a fresh `StatsSnapshot`, so results always reflect the store as it is now.

pub mod analyte;
pub mod combo;
pub mod exclusion;
pub mod status;
pub mod weekday;

pub use analyte::*;
pub use combo::*;
pub use exclusion::*;
pub use status::*;
pub use weekday::*;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::db::{self, DatabaseError, SampleStore};
use crate::mapping::SchemaMapping;
use crate::models::{
    AnalyteCount, ComboStats, SampleRecord, StatusCounts, StatusFilter, SuspectedSample,
    TimeWindow, WeekdayReport,
};

#[derive(Debug, Clone)]
pub struct StatsService {
    store: SampleStore,
    mapping: Arc<SchemaMapping>,
}

impl StatsService {
    pub fn new(store: SampleStore, mapping: Arc<SchemaMapping>) -> Self {
        Self { store, mapping }
    }

    /// Same mapping, different store.
    pub fn with_store(&self, store: SampleStore) -> Self {
        Self {
            store,
            mapping: Arc::clone(&self.mapping),
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn mapping(&self) -> &SchemaMapping {
        &self.mapping
    }

    pub fn load_samples(&self) -> Result<Vec<SampleRecord>, DatabaseError> {
        let conn = self.store.connect()?;
        db::load_samples(&conn, &self.mapping)
    }

    pub fn list_all_analytes(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.store.connect()?;
        db::list_all_analytes(&conn, &self.mapping)
    }

    /// Load the store once and compute the missing-draw exclusions as of
    /// `reference`.
    pub fn snapshot(&self, reference: &NaiveDateTime) -> Result<StatsSnapshot, DatabaseError> {
        Ok(StatsSnapshot::new(self.load_samples()?, *reference))
    }

    /// Combinations never honour exclusions, so no reference instant is needed.
    pub fn combo_stats(&self, since: &NaiveDateTime, max_k: usize) -> Result<ComboStats, DatabaseError> {
        Ok(combo_stats(&self.load_samples()?, since, max_k))
    }
}

/// One loaded sample set with its exclusions. Every report taken from the
/// same snapshot sees the same rows.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    samples: Vec<SampleRecord>,
    exclusions: ExclusionSet,
    reference: NaiveDateTime,
}

impl StatsSnapshot {
    fn new(samples: Vec<SampleRecord>, reference: NaiveDateTime) -> Self {
        let exclusions = compute_exclusions(&samples, &reference);
        Self {
            samples,
            exclusions,
            reference,
        }
    }

    pub fn suspected(&self) -> Vec<SuspectedSample> {
        list_suspected(&self.samples, &self.reference)
    }

    pub fn counts_by_status(&self, window: &TimeWindow) -> StatusCounts {
        counts_by_status(&self.samples, window, &self.exclusions)
    }

    /// Batch counts; exclusions are not applied.
    pub fn count_requests(&self, codes: &[String], window: &TimeWindow) -> Vec<AnalyteCount> {
        count_requests(&self.samples, codes, window)
    }

    pub fn count_analyte_requests(&self, code: &str, window: &TimeWindow) -> u64 {
        count_analyte_requests(&self.samples, code, window, &self.exclusions)
    }

    pub fn count_open_since(&self, codes: &[String], since: &NaiveDateTime) -> Vec<AnalyteCount> {
        count_open_since(&self.samples, codes, since, &self.exclusions)
    }

    pub fn weekday_report(
        &self,
        window: &TimeWindow,
        status: StatusFilter,
        analyte: Option<&str>,
    ) -> WeekdayReport {
        weekday_report(&self.samples, window, status, analyte, &self.exclusions)
    }
}
