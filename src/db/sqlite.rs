use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use super::DatabaseError;

/// The lab system may hold a write lock briefly while filing results.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a SQLite connection to an existing store. Never creates the file.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    if !path.is_file() {
        return Err(DatabaseError::StoreUnavailable {
            path: path.display().to_string(),
        });
    }
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Location of the externally owned sample store.
///
/// A connection is opened per operation; the store belongs to the lab
/// system and may be replaced or moved between calls.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    path: Option<PathBuf>,
}

impl SampleStore {
    /// An empty path means "not configured".
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = (!path.as_os_str().is_empty()).then_some(path);
        Self { path }
    }

    pub fn unconfigured() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.path.as_deref().is_some_and(Path::is_file)
    }

    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        match &self.path {
            Some(path) => open_database(path).inspect_err(|e| {
                if e.is_unavailable() {
                    tracing::warn!(path = %path.display(), "Sample store not found");
                }
            }),
            None => Err(DatabaseError::StoreUnavailable {
                path: String::new(),
            }),
        }
    }
}
