//! Periodic snapshot/restore pipeline
//!
//! The snapshotter reads `Repository::all()` on a fixed interval and
//! overwrites the backing file with the serialized points. On startup, when
//! the restore flag is set, it reads the file back and bulk-imports via
//! `load`; a missing or corrupt file is recoverable (log and continue with
//! an empty repository). On graceful shutdown the server takes one final
//! flush regardless of the periodic schedule.
//!
//! A store interval of 0 selects write-through mode: the ingestion handlers
//! flush after every successful mutation instead of running the loop. A
//! negative interval disables snapshotting entirely. The snapshotter
//! introduces no lock of its own; it relies on the repository's concurrency
//! discipline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use super::repository::Repository;
use crate::MetricPoint;

/// Serialized form of a repository snapshot on disk (JSON array of points).
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> StorageResult<Vec<MetricPoint>> {
        let data = fs::read(&self.path)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&data).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn write(&self, points: &[MetricPoint]) -> StorageResult<()> {
        let data = serde_json::to_vec(points)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Periodic snapshot job over the active repository.
pub struct Snapshotter {
    repository: Arc<dyn Repository>,
    file: SnapshotFile,
    interval_secs: i64,
}

impl Snapshotter {
    pub fn new(repository: Arc<dyn Repository>, path: impl AsRef<Path>, interval_secs: i64) -> Self {
        Self {
            repository,
            file: SnapshotFile::new(path),
            interval_secs,
        }
    }

    /// Whether ingestion handlers should flush after every mutation.
    pub fn write_through(&self) -> bool {
        self.interval_secs == 0
    }

    /// Read the snapshot file and bulk-import it into the repository.
    ///
    /// A missing or unreadable file leaves the repository empty; restart
    /// recovery must never be fatal.
    pub async fn restore(&self) {
        let points = match self.file.read() {
            Ok(points) => points,
            Err(e) => {
                warn!(
                    "unable to restore metrics from {}: {e}; starting empty",
                    self.file.path().display()
                );
                return;
            }
        };

        match self.repository.load(points).await {
            Ok(()) => info!("metrics restored from {}", self.file.path().display()),
            Err(e) => warn!("failed to import restored metrics: {e}"),
        }
    }

    /// Snapshot the full repository state into the backing file.
    pub async fn flush(&self) -> StorageResult<()> {
        let points = self.repository.all().await?;
        self.file.write(&points)?;
        debug!(
            "snapshot of {} points written to {}",
            points.len(),
            self.file.path().display()
        );
        Ok(())
    }

    /// Run the periodic snapshot loop until `shutdown` fires.
    ///
    /// A non-positive interval disables the loop entirely; the final
    /// shutdown flush is the caller's responsibility either way.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.interval_secs <= 0 {
            debug!("periodic snapshots disabled (interval {})", self.interval_secs);
            return;
        }

        let mut ticker = time::interval(Duration::from_secs(self.interval_secs as u64));
        // interval fires immediately; skip the zeroth tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.flush().await {
                        warn!("periodic snapshot failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    info!("stopping metrics saver");
                    return;
                }
            }
        }
    }
}
