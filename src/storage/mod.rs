//! Storage backends for metric persistence
//!
//! This module provides a trait-based abstraction for storing counter and
//! gauge points in various backends.
//!
//! ## Design
//!
//! - **Trait-based**: the `Repository` trait allows swapping implementations
//! - **Async**: all operations are async for compatibility with Tokio
//! - **Selected once**: `build_repository` picks a backend at startup from
//!   configuration; call sites only ever see `Arc<dyn Repository>`
//!
//! ## Backends
//!
//! - **Memory** (fallback): concurrent in-process maps, no persistence
//! - **File**: JSON file, read-modify-write per call, no internal locking
//! - **Database** (feature `storage-sqlite`, default): SQLite via sqlx with
//!   transactional bulk import
//!
//! The snapshotter pairs the memory backend with file durability: periodic
//! flushes of `all()` plus restore-on-startup.

pub mod error;
pub mod file;
pub mod memory;
pub mod repository;
pub mod snapshot;

#[cfg(feature = "storage-sqlite")]
pub mod database;

use std::sync::Arc;

use tracing::info;

pub use error::{StorageError, StorageResult};
pub use repository::Repository;
pub use snapshot::{SnapshotFile, Snapshotter};

use crate::config::Config;
use crate::{MetricPoint, MetricValue};

/// Extract the stored value of a point, mapping a malformed import (field
/// missing for its kind) to a validation error.
pub(crate) fn point_value(point: &MetricPoint) -> StorageResult<MetricValue> {
    point.metric_value().ok_or_else(|| {
        StorageError::Validation(format!(
            "stored {} '{}' has no value",
            point.kind, point.id
        ))
    })
}

/// Select and construct the storage backend once at startup.
///
/// Precedence: database when a DSN is configured, then file storage when a
/// path is configured, then in-memory.
pub async fn build_repository(config: &Config) -> StorageResult<Arc<dyn Repository>> {
    if let Some(dsn) = config.database_dsn.as_deref().filter(|s| !s.is_empty()) {
        #[cfg(feature = "storage-sqlite")]
        {
            let backend = database::DatabaseBackend::connect(dsn).await?;
            info!("working with database storage at {dsn}");
            return Ok(Arc::new(backend));
        }

        #[cfg(not(feature = "storage-sqlite"))]
        {
            let _ = dsn;
            return Err(StorageError::Unsupported(
                "server was built without database support",
            ));
        }
    }

    if let Some(path) = config
        .file_storage_path
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        let backend = file::FileBackend::new(path)?;
        info!("working with file storage at {path}");
        return Ok(Arc::new(backend));
    }

    info!("working with memory storage");
    Ok(Arc::new(memory::MemoryBackend::new()))
}
