use std::fs;
use std::path::PathBuf;

use csv::WriterBuilder;

use super::{ExportError, RollupSink};
use crate::models::MonthlyRollupRecord;

/// One CSV file per month under the export directory.
#[derive(Debug, Clone)]
pub struct CsvMonthlyExport {
    dir: PathBuf,
}

impl CsvMonthlyExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn partition_path(&self, partition: &str) -> PathBuf {
        self.dir.join(format!("rollup-{partition}.csv"))
    }
}

impl RollupSink for CsvMonthlyExport {
    fn write_month(
        &self,
        partition: &str,
        records: &[MonthlyRollupRecord],
    ) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.partition_path(partition);
        let replaced = path.is_file();

        let mut writer = WriterBuilder::new().has_headers(false).from_path(&path)?;
        writer.write_record(MonthlyRollupRecord::HEADERS)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        tracing::info!(
            path = %path.display(),
            rows = records.len(),
            replaced,
            "Wrote monthly rollup"
        );
        Ok(path)
    }
}
