//! Error types for mirror-store.

use std::path::PathBuf;

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The database location could not be prepared.
    #[error("invalid database path {path}: {source}")]
    InvalidPath {
        /// The path that was rejected.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
