//! Error types for storage operations

use std::fmt;

use crate::MetricKind;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
///
/// `NotFound`, `UnknownKind` and `Validation` surface to callers for
/// per-item decisions; the remaining variants are I/O or database failures
/// that propagate unchanged through the `Repository` call.
#[derive(Debug)]
pub enum StorageError {
    /// No stored point for the requested (kind, id)
    NotFound { kind: MetricKind, id: String },

    /// Kind outside {counter, gauge}
    UnknownKind(String),

    /// Required field missing for its kind
    Validation(String),

    /// Operation invalid for this backend (e.g. ping without a database)
    Unsupported(&'static str),

    /// I/O error (file access, etc.)
    Io(std::io::Error),

    /// Metric serialization/deserialization error
    Serialization(String),

    /// Database connection failed
    ConnectionFailed(String),

    /// Database query failed
    QueryFailed(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { kind, id } => {
                write!(f, "metric '{}' with kind {} not found", id, kind)
            }
            StorageError::UnknownKind(kind) => write!(f, "unknown metric kind: {}", kind),
            StorageError::Validation(msg) => write!(f, "invalid metric: {}", msg),
            StorageError::Unsupported(msg) => write!(f, "operation not supported: {}", msg),
            StorageError::Io(err) => write!(f, "I/O error: {}", err),
            StorageError::Serialization(msg) => {
                write!(f, "metric serialization error: {}", msg)
            }
            StorageError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to storage backend: {}", msg)
            }
            StorageError::QueryFailed(msg) => write!(f, "storage query failed: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// sqlx error conversion (used in database.rs)
#[cfg(feature = "storage-sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io_err) => StorageError::Io(io_err),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageError::ConnectionFailed(err.to_string())
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::QueryFailed(format!("database migration failed: {}", err))
    }
}
