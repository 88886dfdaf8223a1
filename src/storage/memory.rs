//! In-memory storage backend (no persistence)
//!
//! Two maps (one per kind) behind a single reader/writer lock. Every
//! mutating call holds the exclusive lock for its entire read-modify-write,
//! so concurrent writers cannot interleave between reading the old value and
//! writing the new one. Reads copy data out under the shared lock; no caller
//! ever receives a reference into the maps.
//!
//! ## Limitations
//!
//! - **No persistence**: all data lost on restart (pair with the
//!   snapshotter for durability)
//! - **No liveness probe**: `ping` fails with `Unsupported`

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::repository::Repository;
use crate::{MetricKind, MetricPoint, MetricValue};

#[derive(Debug, Default)]
struct Maps {
    counters: HashMap<String, MetricPoint>,
    gauges: HashMap<String, MetricPoint>,
}

/// In-memory storage backend
///
/// Lock hold times are O(1) per operation and no I/O happens under the
/// lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    maps: RwLock<Maps>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryBackend {
    async fn counter(&self, id: &str, delta: i64) -> StorageResult<()> {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());

        // Read a copy, compute, write back, all under the exclusive lock.
        let next = match maps.counters.get(id) {
            Some(existing) => existing.delta.unwrap_or(0) + delta,
            None => delta,
        };
        maps.counters.insert(id.to_string(), MetricPoint::counter(id, next));

        Ok(())
    }

    async fn replace_gauge(&self, id: &str, value: f64) -> StorageResult<()> {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());
        maps.gauges.insert(id.to_string(), MetricPoint::gauge(id, value));
        Ok(())
    }

    async fn get_value(&self, kind: MetricKind, id: &str) -> StorageResult<MetricValue> {
        let point = self.get_metric(kind, id).await?;
        super::point_value(&point)
    }

    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<MetricPoint> {
        let maps = self.maps.read().unwrap_or_else(|e| e.into_inner());

        let map = match kind {
            MetricKind::Counter => &maps.counters,
            MetricKind::Gauge => &maps.gauges,
        };

        map.get(id).cloned().ok_or(StorageError::NotFound {
            kind,
            id: id.to_string(),
        })
    }

    async fn all(&self) -> StorageResult<Vec<MetricPoint>> {
        let maps = self.maps.read().unwrap_or_else(|e| e.into_inner());

        let mut points = Vec::with_capacity(maps.counters.len() + maps.gauges.len());
        points.extend(maps.counters.values().cloned());
        points.extend(maps.gauges.values().cloned());

        Ok(points)
    }

    async fn load(&self, points: Vec<MetricPoint>) -> StorageResult<()> {
        let mut maps = self.maps.write().unwrap_or_else(|e| e.into_inner());

        for point in points {
            match point.kind {
                MetricKind::Counter => maps.counters.insert(point.id.clone(), point),
                MetricKind::Gauge => maps.gauges.insert(point.id.clone(), point),
            };
        }

        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        Err(StorageError::Unsupported(
            "ping requires a database; server is running on memory storage",
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
