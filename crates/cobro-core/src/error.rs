//! Error types for Cobro core operations.
//!
//! Errors are descriptive at the core level; the host maps them onto
//! JSON-RPC error responses without reinterpreting them.

use thiserror::Error;

/// Result type alias for Cobro operations.
pub type Result<T> = std::result::Result<T, CobroError>;

/// Core error type for store and backup operations.
#[derive(Debug, Error)]
pub enum CobroError {
    /// Schema setup or migration error (fatal at startup)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Query execution error, carrying the engine's message verbatim
    #[error("{0}")]
    Query(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem error during backup or restore
    #[error("File error: {0}")]
    File(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for CobroError {
    fn from(err: std::io::Error) -> Self {
        CobroError::File(err.to_string())
    }
}

impl From<rusqlite::Error> for CobroError {
    fn from(err: rusqlite::Error) -> Self {
        CobroError::Query(err.to_string())
    }
}
