use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::db::query::SelectQuery;
use crate::db::DatabaseError;
use crate::mapping::{Ident, SchemaMapping};
use crate::timestamp::{first_parseable, format_instant, RawValue};

/// Header fields and open analytes of a sample, captured before deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSnapshot {
    pub sample_id: String,
    pub name: String,
    pub first_name: String,
    pub birth_date: String,
    pub patient_id: String,
    pub order_number: String,
    pub submitter: String,
    /// Canonical form when parseable, otherwise the first non-blank raw value.
    pub order_timestamp: String,
    /// Distinct open analyte codes, sorted, joined with `", "`.
    pub open_analytes: String,
}

/// Snapshot a sample. `None` when the header no longer exists.
pub fn get_sample_snapshot(
    conn: &Connection,
    mapping: &SchemaMapping,
    sample_id: &str,
) -> Result<Option<SampleSnapshot>, DatabaseError> {
    let fields = &mapping.header_fields;
    let optional: Vec<&Option<Ident>> = vec![
        &fields.name,
        &fields.first_name,
        &fields.birth_date,
        &fields.patient_id,
        &fields.order_number,
    ];
    let present: Vec<&Ident> = optional.iter().filter_map(|f| f.as_ref()).collect();

    let query = SelectQuery::from(&mapping.header_table)
        .column(&mapping.join_key)
        .columns(&mapping.order_timestamp_columns)
        .columns(present.iter().copied())
        .columns(&fields.submitter)
        .where_eq(&mapping.join_key, sample_id.to_string());

    let mut stmt = conn.prepare(&query.sql())?;
    let mut rows = stmt.query(query.param_refs().as_slice())?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut col = 0usize;
    let mut next = || -> Result<RawValue, rusqlite::Error> {
        let value = RawValue::from_value_ref(row.get_ref(col)?);
        col += 1;
        Ok(value)
    };

    let id = next()?.to_text();
    let candidates = (0..mapping.order_timestamp_columns.len())
        .map(|_| next())
        .collect::<Result<Vec<_>, _>>()?;
    let order_timestamp = match first_parseable(candidates.iter()) {
        Some(instant) => format_instant(&instant),
        None => candidates
            .iter()
            .find(|c| !c.is_blank())
            .map(RawValue::to_text)
            .unwrap_or_default(),
    };

    let mut text_of = |field: &Option<Ident>| -> Result<String, rusqlite::Error> {
        match field {
            Some(_) => Ok(next()?.to_text()),
            None => Ok(String::new()),
        }
    };
    let name = text_of(&fields.name)?;
    let first_name = text_of(&fields.first_name)?;
    let birth_date = text_of(&fields.birth_date)?;
    let patient_id = text_of(&fields.patient_id)?;
    let order_number = text_of(&fields.order_number)?;

    let submitter = (0..fields.submitter.len())
        .map(|_| next())
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .find(|v| !v.is_blank())
        .map(|v| v.to_text())
        .unwrap_or_default();

    drop(rows);
    drop(stmt);

    Ok(Some(SampleSnapshot {
        open_analytes: open_analytes_of(conn, mapping, sample_id)?,
        sample_id: id,
        name,
        first_name,
        birth_date,
        patient_id,
        order_number,
        submitter,
        order_timestamp,
    }))
}

fn open_analytes_of(
    conn: &Connection,
    mapping: &SchemaMapping,
    sample_id: &str,
) -> Result<String, DatabaseError> {
    let query = SelectQuery::from(&mapping.line_table)
        .column(&mapping.analyte_column)
        .column(&mapping.result_column)
        .where_eq(&mapping.join_key, sample_id.to_string());
    let mut stmt = conn.prepare(&query.sql())?;
    let mut rows = stmt.query(query.param_refs().as_slice())?;

    let mut open = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let code = RawValue::from_value_ref(row.get_ref(0)?).to_text();
        let result = RawValue::from_value_ref(row.get_ref(1)?);
        if result.is_blank() && !code.is_empty() {
            open.insert(code);
        }
    }
    Ok(open.into_iter().collect::<Vec<_>>().join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::*;

    #[test]
    fn snapshot_collects_header_and_open_analytes() {
        let conn = memory_store();
        seed_sample(
            &conn,
            "P1",
            "20240314114614",
            &[("NA", None), ("K", Some("")), ("NA", None), ("CRP", Some("5"))],
        );

        let snap = get_sample_snapshot(&conn, &SchemaMapping::lab_default(), "P1")
            .unwrap()
            .unwrap();
        assert_eq!(snap.sample_id, "P1");
        assert_eq!(snap.name, "Muster");
        assert_eq!(snap.first_name, "Max");
        assert_eq!(snap.patient_id, "PAT-1");
        assert_eq!(snap.order_number, "A-100");
        // EinsenderInfo is blank, so the second submitter column wins.
        assert_eq!(snap.submitter, "WARD-7");
        assert_eq!(snap.order_timestamp, "2024-03-14 11:46:14");
        assert_eq!(snap.open_analytes, "K, NA");
    }

    #[test]
    fn unparseable_order_time_kept_raw() {
        let conn = memory_store();
        seed_sample(&conn, "P1", "sometime", &[("NA", None)]);
        let snap = get_sample_snapshot(&conn, &SchemaMapping::lab_default(), "P1")
            .unwrap()
            .unwrap();
        assert_eq!(snap.order_timestamp, "sometime");
    }

    #[test]
    fn missing_sample_is_none() {
        let conn = memory_store();
        assert!(get_sample_snapshot(&conn, &SchemaMapping::lab_default(), "NOPE")
            .unwrap()
            .is_none());
    }

    #[test]
    fn mapping_without_header_fields_yields_blanks() {
        let conn = memory_store();
        seed_sample(&conn, "P1", "2024-03-14 08:00:00", &[("NA", None)]);
        let mut mapping = SchemaMapping::lab_default();
        mapping.header_fields = Default::default();

        let snap = get_sample_snapshot(&conn, &mapping, "P1").unwrap().unwrap();
        assert_eq!(snap.name, "");
        assert_eq!(snap.submitter, "");
        assert_eq!(snap.open_analytes, "NA");
    }
}
