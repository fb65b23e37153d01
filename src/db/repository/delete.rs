use rusqlite::Connection;

use crate::db::query::DeleteQuery;
use crate::db::DatabaseError;
use crate::mapping::SchemaMapping;

/// Stays well under SQLite's bound-parameter limit.
const DELETE_CHUNK: usize = 500;

/// Delete all lines and headers for `sample_ids` in one transaction.
///
/// Returns the total number of rows removed across both tables. Ids that no
/// longer exist contribute nothing.
pub fn delete_samples(
    conn: &Connection,
    mapping: &SchemaMapping,
    sample_ids: &[String],
) -> Result<usize, DatabaseError> {
    if sample_ids.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    let mut lines = 0usize;
    let mut headers = 0usize;

    for chunk in sample_ids.chunks(DELETE_CHUNK) {
        let line_delete = DeleteQuery::from(&mapping.line_table).where_in(&mapping.join_key, chunk);
        lines += tx.execute(&line_delete.sql(), line_delete.param_refs().as_slice())?;

        let header_delete =
            DeleteQuery::from(&mapping.header_table).where_in(&mapping.join_key, chunk);
        headers += tx.execute(&header_delete.sql(), header_delete.param_refs().as_slice())?;
    }

    tx.commit()?;

    tracing::info!(
        requested = sample_ids.len(),
        lines,
        headers,
        "Deleted samples"
    );
    Ok(lines + headers)
}
