use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::sample::SampleId;

/// Sample tally over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub open: u64,
    pub done: u64,
    pub all: u64,
}

/// Request count for one analyte code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyteCount {
    pub code: String,
    pub count: u64,
}

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Per-weekday count. Index 0 is Monday.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayStat {
    pub weekday: u8,
    pub label: &'static str,
    pub count: u64,
    /// Date occurrences of this weekday in the queried range.
    pub days: u32,
    /// `count / max(1, days)`, rounded to 2 decimals.
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekdayReport {
    pub days: Vec<WeekdayStat>,
    /// Sum of all weekday counts / 7. Only present without an analyte filter.
    pub overall_average: Option<f64>,
}

impl WeekdayReport {
    pub fn total(&self) -> u64 {
        self.days.iter().map(|d| d.count).sum()
    }
}

/// One exact open-analyte combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboEntry {
    /// Sorted codes joined with `" + "`.
    pub key: String,
    pub count: u64,
}

/// All combinations of one exact size, count descending then key ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboBucket {
    pub size: usize,
    pub entries: Vec<ComboEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboStats {
    pub buckets: Vec<ComboBucket>,
}

impl ComboStats {
    pub fn bucket(&self, size: usize) -> Option<&ComboBucket> {
        self.buckets.iter().find(|b| b.size == size)
    }
}

/// A sample flagged as "suspected missing blood draw".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspectedSample {
    pub sample_id: SampleId,
    pub order_instant: NaiveDateTime,
    pub line_count: usize,
    /// Distinct analyte codes joined with `", "`.
    pub analytes: String,
}

/// Everything the counts view shows for one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountsReport {
    pub analyte_counts: Vec<AnalyteCount>,
    pub status: StatusCounts,
    pub weekdays: WeekdayReport,
}

/// Snapshot of a deleted sample, written to the audit log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp: String,
    pub sample_id: String,
    pub name: String,
    pub first_name: String,
    pub birth_date: String,
    pub patient_id: String,
    pub order_timestamp: String,
    pub order_number: String,
    pub submitter: String,
    pub analyte_list: String,
}

impl AuditRecord {
    pub const HEADERS: [&'static str; 10] = [
        "Timestamp",
        "SampleId",
        "Name",
        "FirstName",
        "BirthDate",
        "PatientId",
        "OrderTimestamp",
        "OrderNumber",
        "Submitter",
        "AnalyteList",
    ];

    /// Value for a header column; unknown columns are empty.
    pub fn field(&self, header: &str) -> &str {
        match header {
            "Timestamp" => &self.timestamp,
            "SampleId" => &self.sample_id,
            "Name" => &self.name,
            "FirstName" => &self.first_name,
            "BirthDate" => &self.birth_date,
            "PatientId" => &self.patient_id,
            "OrderTimestamp" => &self.order_timestamp,
            "OrderNumber" => &self.order_number,
            "Submitter" => &self.submitter,
            "AnalyteList" => &self.analyte_list,
            _ => "",
        }
    }
}

/// One row of the monthly rollup partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonthlyRollupRecord {
    pub analyte_code: String,
    pub count_since_month_start: u64,
    pub created_at: String,
}

impl MonthlyRollupRecord {
    pub const HEADERS: [&'static str; 3] = ["AnalyteCode", "CountSinceMonthStart", "CreatedAt"];
}

/// Round to 2 decimals for display averages.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_headers_match_fields() {
        let record = AuditRecord {
            sample_id: "P1".into(),
            analyte_list: "K, NA".into(),
            ..Default::default()
        };
        assert_eq!(record.field("SampleId"), "P1");
        assert_eq!(record.field("AnalyteList"), "K, NA");
        assert_eq!(record.field("Unknown"), "");
        assert_eq!(AuditRecord::HEADERS.len(), 10);
    }

    #[test]
    fn round2_rounds_half_away() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(4.0), 4.0);
    }
}
