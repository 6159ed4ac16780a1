//! Error types for the feed cache.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from cache store operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to open or create the database file.
    #[error("Failed to open cache database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// Failed to run a database migration.
    #[error("Cache migration failed: {0}")]
    Migration(#[from] rusqlite::Error),

    /// A query failed.
    #[error("Cache query failed: {0}")]
    Query(String),

    /// Reading or writing the payload file failed.
    #[error("Payload file error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to spawn a blocking task.
    #[error("Failed to spawn blocking task: {0}")]
    Spawn(#[from] tokio::task::JoinError),

    /// The database schema version is newer than supported.
    #[error("Cache schema version {found} is newer than supported version {expected}")]
    UnsupportedSchemaVersion { found: i32, expected: i32 },
}

impl CacheError {
    /// Create a Query error from a rusqlite error.
    pub fn query(source: rusqlite::Error) -> Self {
        Self::Query(source.to_string())
    }
}
