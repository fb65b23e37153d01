use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::db::query::SelectQuery;
use crate::db::DatabaseError;
use crate::mapping::SchemaMapping;
use crate::timestamp::RawValue;

/// Distinct, non-blank analyte codes from the line table, sorted.
pub fn list_all_analytes(
    conn: &Connection,
    mapping: &SchemaMapping,
) -> Result<Vec<String>, DatabaseError> {
    let query = SelectQuery::from(&mapping.line_table)
        .distinct()
        .column(&mapping.analyte_column);
    let mut stmt = conn.prepare(&query.sql())?;
    let mut rows = stmt.query(query.param_refs().as_slice())?;

    let mut codes = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let code = RawValue::from_value_ref(row.get_ref(0)?).to_text();
        if !code.is_empty() {
            codes.insert(code);
        }
    }
    Ok(codes.into_iter().collect())
}
