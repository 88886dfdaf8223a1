//! File-backed storage (JSON array on disk)
//!
//! The durable form is a single JSON array of metric points. Every mutating
//! call performs a full read-modify-write cycle: read the whole file, scan
//! for an existing point with the same (kind, id), update or append, rewrite
//! the whole file. There is no in-memory cache, so every call pays file I/O.
//!
//! ## Concurrency
//!
//! This backend provides no internal concurrency control. Callers invoking
//! it from multiple tasks concurrently must serialize externally or risk
//! lost updates or a corrupted file. This is a documented limitation of the
//! design, not an oversight.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info};

use super::error::{StorageError, StorageResult};
use super::repository::Repository;
use crate::{MetricKind, MetricPoint, MetricValue};

/// File-backed storage backend
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Open a file backend at `path`, seeding an empty array when the file
    /// does not exist yet. Later read failures are real errors.
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            fs::write(&path, b"[]")?;
            info!("created metrics file at {}", path.display());
        }

        Ok(Self { path })
    }

    fn read_points(&self) -> StorageResult<Vec<MetricPoint>> {
        let data = fs::read(&self.path).inspect_err(|e| {
            error!("unable to read metrics file {}: {e}", self.path.display());
        })?;

        if data.is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&data).map_err(|e| {
            error!(
                "unable to parse metrics file {}: {e}",
                self.path.display()
            );
            StorageError::Serialization(e.to_string())
        })
    }

    fn write_points(&self, points: &[MetricPoint]) -> StorageResult<()> {
        let data = serde_json::to_vec(points)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[async_trait]
impl Repository for FileBackend {
    async fn counter(&self, id: &str, delta: i64) -> StorageResult<()> {
        let mut points = self.read_points()?;

        match points
            .iter_mut()
            .find(|p| p.kind == MetricKind::Counter && p.id == id)
        {
            Some(existing) => existing.delta = Some(existing.delta.unwrap_or(0) + delta),
            None => points.push(MetricPoint::counter(id, delta)),
        }

        self.write_points(&points)
    }

    async fn replace_gauge(&self, id: &str, value: f64) -> StorageResult<()> {
        let mut points = self.read_points()?;

        match points
            .iter_mut()
            .find(|p| p.kind == MetricKind::Gauge && p.id == id)
        {
            Some(existing) => existing.value = Some(value),
            None => points.push(MetricPoint::gauge(id, value)),
        }

        self.write_points(&points)
    }

    async fn get_value(&self, kind: MetricKind, id: &str) -> StorageResult<MetricValue> {
        let point = self.get_metric(kind, id).await?;
        super::point_value(&point)
    }

    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<MetricPoint> {
        let points = self.read_points()?;

        points
            .into_iter()
            .find(|p| p.kind == kind && p.id == id)
            .ok_or(StorageError::NotFound {
                kind,
                id: id.to_string(),
            })
    }

    async fn all(&self) -> StorageResult<Vec<MetricPoint>> {
        self.read_points()
    }

    async fn load(&self, points: Vec<MetricPoint>) -> StorageResult<()> {
        // Bulk import replaces the whole file content.
        self.write_points(&points)
    }

    async fn ping(&self) -> StorageResult<()> {
        Err(StorageError::Unsupported(
            "ping requires a database; server is running on file storage",
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing file backend (no-op)");
        Ok(())
    }
}
