use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::{AuditSink, ExportError};
use crate::models::AuditRecord;

/// Deleted-sample log as a CSV file with a single header row.
#[derive(Debug, Clone)]
pub struct CsvAuditLog {
    path: PathBuf,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header of the existing log, or `None` when the file is absent or empty.
    fn existing_header(&self) -> Result<Option<Vec<String>>, ExportError> {
        if !self.path.is_file() || fs::metadata(&self.path)?.len() == 0 {
            return Ok(None);
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let header = reader
            .headers()?
            .iter()
            .map(|h| h.trim_matches('\u{feff}').to_string())
            .collect();
        Ok(Some(header))
    }

    fn create(&self, records: &[AuditRecord]) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = WriterBuilder::new().has_headers(false).from_path(&self.path)?;
        writer.write_record(AuditRecord::HEADERS)?;
        for record in records {
            writer.write_record(AuditRecord::HEADERS.iter().map(|h| record.field(h)))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn append(&self, header: &[String], records: &[AuditRecord]) -> Result<(), ExportError> {
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        terminate_last_row(&mut file)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        for record in records {
            writer.write_record(header.iter().map(|h| record.field(h)))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rewrite the log under `header` plus any missing audit columns.
    /// Existing rows keep their values and get blanks for the new columns.
    fn upgrade(&self, header: Vec<String>) -> Result<Vec<String>, ExportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let rows: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;

        let mut union = header;
        let old_width = union.len();
        for h in AuditRecord::HEADERS {
            if !union.iter().any(|e| e == h) {
                union.push(h.to_string());
            }
        }

        let mut writer = WriterBuilder::new().has_headers(false).from_path(&self.path)?;
        writer.write_record(&union)?;
        for row in &rows {
            writer.write_record((0..union.len()).map(|i| row.get(i).unwrap_or("")))?;
        }
        writer.flush()?;

        tracing::info!(
            path = %self.path.display(),
            added_columns = union.len() - old_width,
            rows = rows.len(),
            "Upgraded audit log header"
        );
        Ok(union)
    }
}

/// End a non-empty file with a newline so appended rows start on their own line.
fn terminate_last_row(file: &mut File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

impl AuditSink for CsvAuditLog {
    fn append_deleted(&self, records: &[AuditRecord]) -> Result<(), ExportError> {
        if records.is_empty() {
            return Ok(());
        }

        match self.existing_header()? {
            None => self.create(records)?,
            Some(header) => {
                let complete = AuditRecord::HEADERS
                    .iter()
                    .all(|h| header.iter().any(|e| e == h));
                let header = if complete { header } else { self.upgrade(header)? };
                self.append(&header, records)?;
            }
        }

        tracing::debug!(path = %self.path.display(), rows = records.len(), "Appended audit records");
        Ok(())
    }
}
