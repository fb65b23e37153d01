pub mod query;
pub mod repository;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod fixtures;

pub use repository::*;
pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Sample store unavailable: {path}")]
    StoreUnavailable { path: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}

impl DatabaseError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DatabaseError::StoreUnavailable { .. })
    }
}

/// Collapse a read result to its empty value, for views that render
/// "no data" instead of an error.
pub trait OrEmpty<T> {
    fn or_empty(self) -> T;
}

impl<T: Default> OrEmpty<T> for Result<T, DatabaseError> {
    fn or_empty(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) if e.is_unavailable() => {
                tracing::debug!(error = %e, "Store unavailable, showing empty result");
                T::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query failed, showing empty result");
                T::default()
            }
        }
    }
}
