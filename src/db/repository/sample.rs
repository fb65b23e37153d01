use std::collections::HashMap;

use rusqlite::Connection;

use crate::db::query::SelectQuery;
use crate::db::DatabaseError;
use crate::mapping::SchemaMapping;
use crate::models::{SampleLine, SampleRecord};
use crate::timestamp::{first_parseable, RawValue};

/// Load every sample header with its normalized order instant, then attach
/// all of its lines. Lines without a header are dropped (inner-join
/// semantics); headers without lines are kept with an empty line list.
pub fn load_samples(
    conn: &Connection,
    mapping: &SchemaMapping,
) -> Result<Vec<SampleRecord>, DatabaseError> {
    let mut samples = load_headers(conn, mapping)?;
    let index: HashMap<String, usize> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();

    let query = SelectQuery::from(&mapping.line_table)
        .column(&mapping.join_key)
        .column(&mapping.analyte_column)
        .column(&mapping.result_column);
    let mut stmt = conn.prepare(&query.sql())?;
    let mut rows = stmt.query(query.param_refs().as_slice())?;

    let mut orphans = 0usize;
    while let Some(row) = rows.next()? {
        let id = RawValue::from_value_ref(row.get_ref(0)?).to_text();
        let analyte = RawValue::from_value_ref(row.get_ref(1)?).to_text();
        let result = RawValue::from_value_ref(row.get_ref(2)?);
        match index.get(&id) {
            Some(&i) => samples[i].lines.push(SampleLine::new(analyte, result)),
            None => orphans += 1,
        }
    }

    tracing::debug!(
        samples = samples.len(),
        orphan_lines = orphans,
        "Loaded samples"
    );
    Ok(samples)
}

fn load_headers(
    conn: &Connection,
    mapping: &SchemaMapping,
) -> Result<Vec<SampleRecord>, DatabaseError> {
    let query = SelectQuery::from(&mapping.header_table)
        .column(&mapping.join_key)
        .columns(&mapping.order_timestamp_columns);
    let candidates = mapping.order_timestamp_columns.len();

    let mut stmt = conn.prepare(&query.sql())?;
    let mut rows = stmt.query(query.param_refs().as_slice())?;

    let mut samples = Vec::new();
    let mut unparseable = 0usize;
    while let Some(row) = rows.next()? {
        let id = RawValue::from_value_ref(row.get_ref(0)?).to_text();
        let raw = (1..=candidates)
            .map(|i| row.get_ref(i).map(RawValue::from_value_ref))
            .collect::<Result<Vec<_>, _>>()?;
        let order_instant = first_parseable(raw.iter());
        if order_instant.is_none() {
            unparseable += 1;
        }
        samples.push(SampleRecord {
            id,
            order_instant,
            lines: Vec::new(),
        });
    }

    if unparseable > 0 {
        tracing::debug!(count = unparseable, "Samples without a parseable order timestamp");
    }
    Ok(samples)
}
