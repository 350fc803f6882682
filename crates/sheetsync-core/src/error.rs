//! Error types for sheetsync-core

use thiserror::Error;

/// Result type alias using sheetsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheetsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sheet or journal not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The journal lock could not be acquired in time
    #[error("Journal lock not acquired within {waited_ms} ms")]
    LockTimeout { waited_ms: u64 },
}
