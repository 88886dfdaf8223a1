//! Shared state passed to all API handlers

use std::sync::Arc;

use tracing::warn;

use crate::audit::AuditLog;
use crate::storage::{Repository, Snapshotter};

/// Shared state for the ingestion and query handlers
#[derive(Clone)]
pub struct AppState {
    /// The active storage backend, selected once at startup
    pub repository: Arc<dyn Repository>,

    /// Snapshotter, present when a snapshot file is configured
    pub snapshotter: Option<Arc<Snapshotter>>,

    /// Audit fan-out, present when a subscriber is configured
    pub audit: Option<Arc<AuditLog>>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn Repository>,
        snapshotter: Option<Arc<Snapshotter>>,
        audit: Option<Arc<AuditLog>>,
    ) -> Self {
        Self {
            repository,
            snapshotter,
            audit,
        }
    }

    /// Flush the snapshot after a successful mutation when running in
    /// write-through mode (store interval 0). Flush failures are logged and
    /// do not fail the request.
    pub async fn flush_write_through(&self) {
        if let Some(snapshotter) = &self.snapshotter {
            if snapshotter.write_through() {
                if let Err(e) = snapshotter.flush().await {
                    warn!("write-through snapshot failed: {e}");
                }
            }
        }
    }
}
