//! Command-line arguments.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};

use labstat_lib::models::{PathKey, StatusFilter};
use labstat_lib::timestamp::{normalize, RawValue};

#[derive(Parser)]
#[command(
    name = "labstat",
    version,
    about = "Sample statistics, missing-draw review and audit export for a lab database"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (default: ~/LabStat/settings.json).
    #[arg(long, value_name = "PATH", global = true)]
    pub settings: Option<PathBuf>,

    /// Schema mapping file (default: resources/mapping.json).
    #[arg(long, value_name = "PATH", global = true)]
    pub mapping: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List analyte codes in the store.
    Analytes {
        /// Only codes not excluded in the settings.
        #[arg(long)]
        included: bool,
    },

    /// Add codes to the excluded-analyte filter.
    Exclude {
        #[arg(required = true, value_name = "CODE")]
        codes: Vec<String>,
    },

    /// Remove codes from the excluded-analyte filter.
    Include {
        #[arg(required = true, value_name = "CODE")]
        codes: Vec<String>,
    },

    /// Analyte, status and weekday counts for a date range.
    Counts(CountsArgs),

    /// Open requirements per analyte since an instant.
    Open {
        #[arg(long, value_parser = parse_instant)]
        since: NaiveDateTime,

        /// Analyte codes (default: included analytes).
        #[arg(long = "analyte", value_name = "CODE")]
        analytes: Vec<String>,
    },

    /// Samples suspected of a missing blood draw.
    Suspects,

    /// Delete samples, recording each in the audit log first.
    Delete {
        /// Sample ids to delete.
        #[arg(value_name = "SAMPLE_ID", required_unless_present = "suspects")]
        ids: Vec<String>,

        /// Delete every currently suspected sample.
        #[arg(long, conflicts_with = "ids")]
        suspects: bool,
    },

    /// Exact open-analyte combinations since an instant.
    Combos {
        #[arg(long, value_parser = parse_instant)]
        since: NaiveDateTime,

        /// Largest combination size (1-4).
        #[arg(long, default_value_t = 4)]
        max_k: usize,

        /// Entries kept per size; 0 keeps all.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Write the monthly rollup (only on the 1st unless forced).
    MonthlyExport {
        #[arg(long)]
        force: bool,
    },

    /// Set a configured path: database, audit-file or export-dir.
    SetPath {
        #[arg(value_parser = parse_path_key)]
        key: PathKey,
        value: String,
    },
}

#[derive(Parser)]
pub struct CountsArgs {
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub from: NaiveDate,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub to: NaiveDate,

    /// Analyte codes (default: included analytes).
    #[arg(long = "analyte", value_name = "CODE")]
    pub analytes: Vec<String>,

    /// Weekday status filter: open, done or all.
    #[arg(long, default_value = "all", value_parser = parse_status)]
    pub status: StatusFilter,

    /// Restrict the weekday breakdown to one analyte.
    #[arg(long, value_name = "CODE")]
    pub weekday_analyte: Option<String>,
}

/// A plain `YYYY-MM-DD` (midnight) or anything the timestamp normalizer reads.
fn parse_instant(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(date) = s.trim().parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    normalize(&RawValue::from(s)).ok_or_else(|| format!("unrecognised date/time: {s}"))
}

fn parse_status(s: &str) -> Result<StatusFilter, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_path_key(s: &str) -> Result<PathKey, String> {
    s.parse().map_err(|e| format!("{e}"))
}
