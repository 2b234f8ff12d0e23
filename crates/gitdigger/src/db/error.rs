use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A stored value does not decode into its domain type.
    #[error("Unreadable value in column '{column}': {value}")]
    CorruptValue { column: &'static str, value: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
