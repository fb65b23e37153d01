//! Test fixtures: a store shaped like the lab system's default schema.

use std::path::PathBuf;

use rusqlite::types::ToSql;
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Timestamp columns are declared without a type so every storage class
/// survives as written.
const SCHEMA: &str = "
    CREATE TABLE Befund (
        ProbenNr TEXT PRIMARY KEY,
        AbnahmeDatum,
        TimeStamp,
        Name TEXT,
        Vname TEXT,
        GebDat TEXT,
        PatID TEXT,
        AuftragsNr TEXT,
        EinsenderInfo TEXT,
        EinsenderKennung TEXT
    );
    CREATE TABLE BefTag (
        ProbenNr TEXT NOT NULL,
        TestKB TEXT,
        Ergebnis
    );
";

pub fn memory_store() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory DB");
    conn.execute_batch(SCHEMA).expect("fixture schema");
    conn
}

/// A file-backed store for code paths that reopen the database by path.
pub fn file_store() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("lab.db");
    let conn = Connection::open(&path).expect("file DB");
    conn.execute_batch(SCHEMA).expect("fixture schema");
    (dir, path)
}

/// Insert a header with `AbnahmeDatum` set to `order_ts` (any storage class).
pub fn seed_header(conn: &Connection, id: &str, order_ts: &dyn ToSql) {
    conn.execute(
        "INSERT INTO Befund (ProbenNr, AbnahmeDatum, Name, Vname, GebDat, PatID, AuftragsNr, EinsenderInfo, EinsenderKennung)
         VALUES (?1, ?2, 'Muster', 'Max', '1970-01-01', 'PAT-1', 'A-100', '', 'WARD-7')",
        params![id, order_ts],
    )
    .expect("seed header");
}

/// Insert lines as `(analyte, result)`; `None` stores NULL.
pub fn seed_lines(conn: &Connection, id: &str, lines: &[(&str, Option<&str>)]) {
    for (code, result) in lines {
        conn.execute(
            "INSERT INTO BefTag (ProbenNr, TestKB, Ergebnis) VALUES (?1, ?2, ?3)",
            params![id, code, result],
        )
        .expect("seed line");
    }
}

pub fn seed_sample(conn: &Connection, id: &str, order_ts: &str, lines: &[(&str, Option<&str>)]) {
    seed_header(conn, id, &order_ts);
    seed_lines(conn, id, lines);
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}
