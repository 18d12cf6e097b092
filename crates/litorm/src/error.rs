//! Error types for litorm

use thiserror::Error;

/// Result type alias for litorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Model metadata is unknown, conflicting or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller asked for a statement that cannot be built
    #[error("Query error: {0}")]
    Query(String),

    /// Storage engine error, passed through unchanged
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Gateway connection error (queue closed, worker gone)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl OrmError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a query error
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    /// Check if this is a storage error
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if the storage engine rejected the statement on a constraint
    /// (UNIQUE, NOT NULL, FOREIGN KEY, CHECK).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Storage(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}
