use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use super::enums::SampleStatus;
use crate::timestamp::RawValue;

/// Sample identifier as text, whatever the join key's storage class.
pub type SampleId = String;

/// One requested analyte on a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLine {
    pub analyte: String,
    pub result: RawValue,
}

impl SampleLine {
    pub fn new(analyte: impl Into<String>, result: RawValue) -> Self {
        Self {
            analyte: analyte.into(),
            result,
        }
    }

    /// A line is open while its result is NULL or blank.
    pub fn is_open(&self) -> bool {
        self.result.is_blank()
    }
}

/// A sample header with its normalized order instant and all of its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub id: SampleId,
    pub order_instant: Option<NaiveDateTime>,
    pub lines: Vec<SampleLine>,
}

impl SampleRecord {
    pub fn done_count(&self) -> usize {
        self.lines.iter().filter(|l| !l.is_open()).count()
    }

    /// Done iff every line has a result. Samples without lines have no status.
    pub fn status(&self) -> Option<SampleStatus> {
        status_of(&self.lines)
    }

    /// Sorted, deduplicated codes of the open lines.
    pub fn open_analytes(&self) -> BTreeSet<String> {
        self.lines
            .iter()
            .filter(|l| l.is_open())
            .map(|l| l.analyte.trim())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Sorted, deduplicated codes of all lines.
    pub fn analytes(&self) -> BTreeSet<String> {
        self.lines
            .iter()
            .map(|l| l.analyte.trim())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn ordered_within(&self, window: &TimeWindow) -> bool {
        self.order_instant.is_some_and(|t| window.contains(&t))
    }

    pub fn ordered_since(&self, since: &NaiveDateTime) -> bool {
        self.order_instant.is_some_and(|t| t >= *since)
    }
}

/// Status over an arbitrary subset of a sample's lines.
pub fn status_of<'a, I>(lines: I) -> Option<SampleStatus>
where
    I: IntoIterator<Item = &'a SampleLine>,
{
    let mut total = 0usize;
    let mut done = 0usize;
    for line in lines {
        total += 1;
        if !line.is_open() {
            done += 1;
        }
    }
    match total {
        0 => None,
        t if t == done => Some(SampleStatus::Done),
        _ => Some(SampleStatus::Open),
    }
}

/// Closed time interval; both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// `start` 00:00:00 through the last nanosecond of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        // NaiveTime arithmetic wraps at midnight: 23:59:59.999999999.
        let end_of_day = NaiveTime::MIN - TimeDelta::nanoseconds(1);
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(end_of_day),
        }
    }

    pub fn contains(&self, instant: &NaiveDateTime) -> bool {
        *instant >= self.start && *instant <= self.end
    }

    /// Every calendar date from the start date through the end date.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end.date();
        self.start
            .date()
            .iter_days()
            .take_while(move |d| *d <= end)
    }
}
