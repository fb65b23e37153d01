//! Delete flagged samples, recording an audit snapshot of each first.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::db::{self, DatabaseError, SampleSnapshot, SampleStore};
use crate::export::AuditSink;
use crate::mapping::SchemaMapping;
use crate::models::AuditRecord;
use crate::timestamp::format_instant;

fn audit_record(snapshot: SampleSnapshot, deleted_at: &str) -> AuditRecord {
    AuditRecord {
        timestamp: deleted_at.to_string(),
        sample_id: snapshot.sample_id,
        name: snapshot.name,
        first_name: snapshot.first_name,
        birth_date: snapshot.birth_date,
        patient_id: snapshot.patient_id,
        order_timestamp: snapshot.order_timestamp,
        order_number: snapshot.order_number,
        submitter: snapshot.submitter,
        analyte_list: snapshot.open_analytes,
    }
}

/// Delete `sample_ids` (header and every line) and return the rows removed.
///
/// Ids that no longer exist are skipped. Snapshots of the remaining samples
/// go to `audit` as one batch before anything is deleted. A failing audit
/// write is logged and does not stop the delete.
pub fn delete_samples_with_audit(
    store: &SampleStore,
    mapping: &SchemaMapping,
    audit: &dyn AuditSink,
    sample_ids: &[String],
    now: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let mut seen = HashSet::new();
    let mut ids: Vec<String> = Vec::new();
    for id in sample_ids {
        if !id.trim().is_empty() && seen.insert(id.as_str()) {
            ids.push(id.clone());
        }
    }
    if ids.is_empty() {
        return Ok(0);
    }

    let conn = store.connect()?;
    let deleted_at = format_instant(now);

    let mut records = Vec::with_capacity(ids.len());
    for id in &ids {
        match db::get_sample_snapshot(&conn, mapping, id)? {
            Some(snapshot) => records.push(audit_record(snapshot, &deleted_at)),
            None => tracing::debug!(sample_id = %id, "Sample already gone, skipping"),
        }
    }

    if let Err(e) = audit.append_deleted(&records) {
        tracing::warn!(error = %e, records = records.len(), "Audit write failed, deleting anyway");
    }

    db::delete_samples(&conn, mapping, &ids)
}
