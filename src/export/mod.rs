//! Audit and rollup collaborators.
//!
//! Both are traits so the deletion and housekeeping paths can be driven
//! against in-memory sinks. The CSV implementations are what the binary uses.

pub mod audit_log;
pub mod monthly;

pub use audit_log::*;
pub use monthly::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{AuditRecord, MonthlyRollupRecord};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Durable, append-only log of deleted samples.
pub trait AuditSink {
    /// Append one batch. An empty batch must leave the log untouched.
    fn append_deleted(&self, records: &[AuditRecord]) -> Result<(), ExportError>;
}

/// Monthly analyte rollup, one partition per `YYYY-MM`.
pub trait RollupSink {
    /// Replace the partition's data rows. Returns where it was written.
    fn write_month(
        &self,
        partition: &str,
        records: &[MonthlyRollupRecord],
    ) -> Result<PathBuf, ExportError>;
}
