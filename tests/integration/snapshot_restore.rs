//! Snapshot and restore pipeline tests

use std::sync::Arc;

use metrics_hub::MetricPoint;
use metrics_hub::storage::{Repository, Snapshotter};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_forced_snapshot_restores_into_fresh_repository() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let source = memory_repository();
    source.counter("PollCount", 3).await.unwrap();
    source.counter("Requests", 11).await.unwrap();
    source.replace_gauge("RandomValue", 0.5).await.unwrap();

    Snapshotter::new(source.clone(), &path, 300)
        .flush()
        .await
        .unwrap();

    // A brand-new repository with restore enabled, pointed at the same
    // file, must come back with the identical point set.
    let restored = memory_repository();
    Snapshotter::new(restored.clone(), &path, 300).restore().await;

    assert_eq!(
        sorted(restored.all().await.unwrap()),
        sorted(source.all().await.unwrap())
    );
}

#[tokio::test]
async fn test_restore_into_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("snapshot.json");

    let source = memory_repository();
    source.counter("polls", 9).await.unwrap();
    Snapshotter::new(source, &snapshot_path, 300)
        .flush()
        .await
        .unwrap();

    let (_dir, file_repo) = file_repository();
    Snapshotter::new(file_repo.clone(), &snapshot_path, 300)
        .restore()
        .await;

    assert_eq!(
        file_repo.all().await.unwrap(),
        vec![MetricPoint::counter("polls", 9)]
    );
}

#[tokio::test]
async fn test_missing_snapshot_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();

    let repository = memory_repository();
    Snapshotter::new(repository.clone(), dir.path().join("nope.json"), 300)
        .restore()
        .await;

    // Startup continues with an empty repository, never an error.
    assert!(repository.all().await.unwrap().is_empty());
    repository.counter("polls", 1).await.unwrap();
}

#[tokio::test]
async fn test_final_flush_captures_writes_after_last_tick() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let repository = memory_repository();
    // Interval is negative: the periodic loop is disabled entirely, the
    // shutdown flush is unconditional anyway.
    let snapshotter = Arc::new(Snapshotter::new(repository.clone(), &path, -1));

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    snapshotter.run(shutdown_rx).await;

    repository.counter("late-write", 4).await.unwrap();
    snapshotter.flush().await.unwrap();

    let restored = memory_repository();
    Snapshotter::new(restored.clone(), &path, -1).restore().await;
    assert_eq!(
        restored.all().await.unwrap(),
        vec![MetricPoint::counter("late-write", 4)]
    );
}
