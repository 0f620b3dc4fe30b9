//! Error types for eventtable
//!
//! Provides a unified error type for all table operations.

use thiserror::Error;

/// Result type alias using TableError
pub type Result<T> = std::result::Result<T, TableError>;

/// Unified error type for table operations
#[derive(Debug, Error)]
pub enum TableError {
    // -------------------------------------------------------------------------
    // Compile-time Errors
    // -------------------------------------------------------------------------
    /// An expression or update-set could not be resolved against the schema.
    /// Fatal to query deployment, never retried.
    #[error("Schema binding error: {0}")]
    SchemaBinding(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Table '{table}' already holds a row with primary key {key}")]
    DuplicatePrimaryKey { table: String, key: String },

    #[error("Row arity mismatch: expected {expected} attributes, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    /// Restore payload does not have the shape of this table's storage.
    #[error("State mismatch: {0}")]
    StateMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for TableError {
    fn from(err: bincode::Error) -> Self {
        TableError::Serialization(err.to_string())
    }
}
