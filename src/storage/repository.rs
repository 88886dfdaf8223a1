//! Repository trait definition
//!
//! This module defines the core `Repository` trait that all storage
//! backends must implement.

use async_trait::async_trait;

use super::error::{StorageResult, StorageError};
use crate::{MetricKind, MetricPoint, MetricValue};

/// Trait for metric storage backends
///
/// All backends (memory, file, database) implement this trait. The trait is
/// designed to be:
///
/// - **Async**: all methods are async for compatibility with Tokio
/// - **Uniform**: callers select a backend once at startup and only ever see
///   `Arc<dyn Repository>` afterwards
/// - **Copy-out**: reads return copies of stored data, never references into
///   backend state
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across request
/// handlers and the snapshotter.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>` which wraps `StorageError`.
/// Implementations convert backend-specific errors to `StorageError`
/// variants.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Merge `delta` into the stored counter, creating it if absent.
    async fn counter(&self, id: &str, delta: i64) -> StorageResult<()>;

    /// Overwrite the stored gauge, creating it if absent. Last write wins.
    async fn replace_gauge(&self, id: &str, value: f64) -> StorageResult<()>;

    /// Read the current value for (kind, id). Fails with `NotFound` if
    /// absent.
    async fn get_value(&self, kind: MetricKind, id: &str) -> StorageResult<MetricValue>;

    /// Read the full point for (kind, id). Same failure modes as
    /// `get_value`.
    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<MetricPoint>;

    /// Snapshot of every stored point, copied out. Enumeration order is
    /// unspecified.
    async fn all(&self) -> StorageResult<Vec<MetricPoint>>;

    /// Bulk import, used for restore and bulk testing. Imported points
    /// overwrite existing ones with the same (kind, id).
    async fn load(&self, points: Vec<MetricPoint>) -> StorageResult<()>;

    /// Apply an ordered batch of ingested points.
    ///
    /// The default implementation validates and applies each point
    /// individually: on failure, points applied earlier in the batch remain
    /// applied. The database backend overrides this with a single
    /// transaction that rolls back entirely on the first failure. Callers
    /// must not assume either behavior; the asymmetry is part of the
    /// contract.
    async fn update_many(&self, points: Vec<MetricPoint>) -> StorageResult<()> {
        for point in points {
            point.validate()?;
            match point.kind {
                MetricKind::Counter => {
                    // validate() guarantees the field is present
                    let delta = point
                        .delta
                        .ok_or_else(|| StorageError::Validation("missing delta".to_string()))?;
                    self.counter(&point.id, delta).await?;
                }
                MetricKind::Gauge => {
                    let value = point
                        .value
                        .ok_or_else(|| StorageError::Validation("missing value".to_string()))?;
                    self.replace_gauge(&point.id, value).await?;
                }
            }
        }
        Ok(())
    }

    /// Liveness probe. Fails with `Unsupported` on backends with no external
    /// dependency to probe.
    async fn ping(&self) -> StorageResult<()>;

    /// Release backend resources. Idempotent.
    async fn close(&self) -> StorageResult<()>;
}
