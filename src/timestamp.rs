//! Timestamp normalization for order-time columns of an externally owned store.
//!
//! The lab system writes order times in whatever encoding the writing client
//! happened to use: ISO text, compact digit strings, dotted European dates,
//! Unix seconds or milliseconds, spreadsheet serial days, Windows FILETIME or
//! .NET ticks. [`normalize`] turns any of them into one canonical
//! `NaiveDateTime`. Epoch-based encodings are read as UTC wall time; textual
//! encodings are taken as written.
//!
//! Rules are tried in a fixed order and the first successful parse wins,
//! because a value can match more than one shape (an 8-digit string is both
//! `YYYYMMDD` and a plausible count of seconds).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::ValueRef;

// ═══════════════════════════════════════════
// Bounds
// ═══════════════════════════════════════════

/// Upper bound for epoch seconds: 3000-01-01T00:00:00Z.
pub const MAX_EPOCH_SECONDS: f64 = 32_503_680_000.0;

/// Epoch milliseconds window. The lower bound keeps it clear of the seconds window.
pub const MIN_EPOCH_MILLIS: f64 = 100_000_000_000.0;
pub const MAX_EPOCH_MILLIS: f64 = 32_503_680_000_000.0;

/// Spreadsheet serial days (1954-10-03 .. 2064-04-12).
pub const MIN_SERIAL_DAYS: f64 = 20_000.0;
pub const MAX_SERIAL_DAYS: f64 = 60_000.0;

/// Day offset between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const SERIAL_UNIX_OFFSET_DAYS: f64 = 25_569.0;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Seconds between 0001-01-01 and 1970-01-01.
const DOTNET_UNIX_OFFSET_SECS: i64 = 62_135_596_800;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Tick-based encodings must land in 1900-01-01 ..= 2999-12-31 to be accepted.
const SANE_MIN_UNIX_SECS: i64 = -2_208_988_800;
const SANE_MAX_UNIX_SECS: i64 = 32_503_679_999;

const ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ═══════════════════════════════════════════
// Raw cell values
// ═══════════════════════════════════════════

/// A cell value as read from the store, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl RawValue {
    /// Read a column value, decoding BLOB text best-effort.
    pub fn from_value_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => RawValue::Null,
            ValueRef::Integer(i) => RawValue::Integer(i),
            ValueRef::Real(f) => RawValue::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                RawValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    /// `true` for NULL and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Integer(_) | RawValue::Real(_) => false,
        }
    }

    /// Display form used in audit records and key columns.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Real(f) => f.to_string(),
            RawValue::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

// ═══════════════════════════════════════════
// Normalization
// ═══════════════════════════════════════════

/// Normalize one raw cell to a canonical instant. `None` means "no timestamp".
pub fn normalize(raw: &RawValue) -> Option<NaiveDateTime> {
    match raw {
        RawValue::Null => None,
        RawValue::Text(s) => normalize_text(s),
        // Integral numbers go through the text rules first so that e.g.
        // 20240314 is read as a compact date rather than as seconds.
        RawValue::Integer(i) => normalize_text(&i.to_string()),
        RawValue::Real(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e18 => {
            normalize_text(&(*f as i64).to_string())
        }
        RawValue::Real(f) => from_number(*f, None),
    }
}

/// Pick the first candidate (in priority order) that normalizes.
pub fn first_parseable<'a, I>(candidates: I) -> Option<NaiveDateTime>
where
    I: IntoIterator<Item = &'a RawValue>,
{
    candidates.into_iter().find_map(normalize)
}

fn normalize_text(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let iso = iso_candidate(s);
    parse_iso(&iso)
        .or_else(|| parse_iso_prefix(&iso))
        .or_else(|| parse_compact_datetime(s))
        .or_else(|| parse_compact_date(s))
        .or_else(|| parse_dotted(s))
        .or_else(|| parse_numeric_text(s))
}

/// Replace a `T` separator with a space and a comma fraction separator with a period.
fn iso_candidate(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.len() > 10 && chars[10] == 'T' {
        chars[10] = ' ';
    }
    if chars.len() > 19 && chars[19] == ',' {
        chars[19] = '.';
    }
    chars.into_iter().collect()
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, ISO_FORMAT))
        .ok()
}

fn parse_iso_prefix(s: &str) -> Option<NaiveDateTime> {
    let prefix: String = s.chars().take(19).collect();
    if prefix.chars().count() < 19 {
        return None;
    }
    NaiveDateTime::parse_from_str(&prefix, ISO_FORMAT).ok()
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_compact_datetime(s: &str) -> Option<NaiveDateTime> {
    if !all_digits(s, 14) {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S").ok()
}

fn parse_compact_date(s: &str) -> Option<NaiveDateTime> {
    if !all_digits(s, 8) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// `DD.MM.YYYY` with an optional ` HH:MM:SS` when the text is long enough.
fn parse_dotted(s: &str) -> Option<NaiveDateTime> {
    let chars: Vec<char> = s.chars().collect();
    if !s.contains('.') || chars.len() < 10 {
        return None;
    }

    if chars.len() >= 19 {
        let head: String = chars[..19].iter().collect();
        if let Ok(dt) = NaiveDateTime::parse_from_str(&head, "%d.%m.%Y %H:%M:%S") {
            return Some(dt);
        }
    }

    let date: String = chars[..10].iter().collect();
    NaiveDate::parse_from_str(&date, "%d.%m.%Y")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_numeric_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(i) = s.parse::<i64>() {
        return from_number(i as f64, Some(i));
    }
    let f = s.parse::<f64>().ok()?;
    if !f.is_finite() {
        return None;
    }
    from_number(f, None)
}

/// Numeric rules. `exact` carries the integer when one is available so that
/// tick encodings keep full precision.
///
/// The serial-day window (20000..=60000) takes priority over Unix seconds even
/// though the seconds rule is listed first; otherwise serial days could never
/// match.
fn from_number(value: f64, exact: Option<i64>) -> Option<NaiveDateTime> {
    let serial = (MIN_SERIAL_DAYS..=MAX_SERIAL_DAYS).contains(&value);

    if (0.0..=MAX_EPOCH_SECONDS).contains(&value) && !serial {
        return from_unix_seconds_f64(value);
    }
    if (MIN_EPOCH_MILLIS..=MAX_EPOCH_MILLIS).contains(&value) {
        return from_unix_seconds_f64(value / 1000.0);
    }
    if serial {
        return from_unix_seconds_f64((value - SERIAL_UNIX_OFFSET_DAYS) * 86_400.0);
    }

    let ticks = exact.or_else(|| (value.fract() == 0.0 && value.abs() < 9.2e18).then_some(value as i64))?;
    from_ticks(ticks, FILETIME_UNIX_OFFSET_SECS).or_else(|| from_ticks(ticks, DOTNET_UNIX_OFFSET_SECS))
}

fn from_unix_seconds_f64(secs: f64) -> Option<NaiveDateTime> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole + 1.0, 0)
    } else {
        (whole, nanos)
    };
    DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

/// 100-ns ticks since an epoch that lies `offset_secs` before 1970.
fn from_ticks(ticks: i64, offset_secs: i64) -> Option<NaiveDateTime> {
    if ticks <= 0 {
        return None;
    }
    let secs = ticks / TICKS_PER_SECOND - offset_secs;
    if !(SANE_MIN_UNIX_SECS..=SANE_MAX_UNIX_SECS).contains(&secs) {
        return None;
    }
    let nanos = (ticks % TICKS_PER_SECOND) as u32 * 100;
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

/// Canonical text form used in reports and audit rows.
pub fn format_instant(instant: &NaiveDateTime) -> String {
    instant.format(ISO_FORMAT).to_string()
}
