//! Contract tests run against every backend
//!
//! The same assertions exercise the memory and file backends (and the
//! database backend when built); the contract is uniform even though the
//! implementations differ materially.

use metrics_hub::storage::{Repository, StorageError};
use metrics_hub::{MetricKind, MetricPoint, MetricValue};
use pretty_assertions::assert_eq;

use crate::helpers::*;

async fn assert_counter_sums(repository: &dyn Repository) {
    for delta in [5, -2, 0, 7] {
        repository.counter("contract-counter", delta).await.unwrap();
    }

    assert_eq!(
        repository
            .get_value(MetricKind::Counter, "contract-counter")
            .await
            .unwrap(),
        MetricValue::Counter(10)
    );
}

async fn assert_gauge_replaces(repository: &dyn Repository) {
    repository.replace_gauge("contract-gauge", 1.5).await.unwrap();
    repository.replace_gauge("contract-gauge", 2.5).await.unwrap();

    // Never 1.5 + 2.5: replacement, not accumulation.
    assert_eq!(
        repository
            .get_value(MetricKind::Gauge, "contract-gauge")
            .await
            .unwrap(),
        MetricValue::Gauge(2.5)
    );
}

async fn assert_absent_is_not_found(repository: &dyn Repository) {
    let err = repository
        .get_value(MetricKind::Counter, "never-written")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err}");

    let err = repository
        .get_metric(MetricKind::Gauge, "never-written")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err}");
}

async fn assert_all_returns_written_set(repository: &dyn Repository) {
    repository.counter("a", 1).await.unwrap();
    repository.replace_gauge("b", 2.0).await.unwrap();
    repository.counter("c", 3).await.unwrap();

    let expected = vec![
        MetricPoint::counter("a", 1),
        MetricPoint::counter("c", 3),
        MetricPoint::gauge("b", 2.0),
    ];

    assert_eq!(sorted(repository.all().await.unwrap()), sorted(expected));
}

async fn assert_load_round_trips(repository: &dyn Repository) {
    let points = vec![
        MetricPoint::counter("polls", 42),
        MetricPoint::gauge("load", 0.25),
    ];

    repository.load(points.clone()).await.unwrap();
    assert_eq!(sorted(repository.all().await.unwrap()), sorted(points));
}

#[tokio::test]
async fn test_memory_backend_contract() {
    assert_counter_sums(memory_repository().as_ref()).await;
    assert_gauge_replaces(memory_repository().as_ref()).await;
    assert_absent_is_not_found(memory_repository().as_ref()).await;
    assert_all_returns_written_set(memory_repository().as_ref()).await;
    assert_load_round_trips(memory_repository().as_ref()).await;
}

#[tokio::test]
async fn test_file_backend_contract() {
    // Each assertion gets a fresh backing file.
    let (_dir, repository) = file_repository();
    assert_counter_sums(repository.as_ref()).await;

    let (_dir, repository) = file_repository();
    assert_gauge_replaces(repository.as_ref()).await;

    let (_dir, repository) = file_repository();
    assert_absent_is_not_found(repository.as_ref()).await;

    let (_dir, repository) = file_repository();
    assert_all_returns_written_set(repository.as_ref()).await;

    let (_dir, repository) = file_repository();
    assert_load_round_trips(repository.as_ref()).await;
}

#[cfg(feature = "storage-sqlite")]
#[tokio::test]
async fn test_database_backend_contract() {
    let (_dir, repository) = database_repository().await;
    assert_counter_sums(repository.as_ref()).await;

    let (_dir, repository) = database_repository().await;
    assert_gauge_replaces(repository.as_ref()).await;

    let (_dir, repository) = database_repository().await;
    assert_absent_is_not_found(repository.as_ref()).await;

    let (_dir, repository) = database_repository().await;
    assert_all_returns_written_set(repository.as_ref()).await;

    let (_dir, repository) = database_repository().await;
    assert_load_round_trips(repository.as_ref()).await;
}

#[tokio::test]
async fn test_ping_support_matches_backend() {
    let memory = memory_repository();
    assert!(matches!(
        memory.ping().await,
        Err(StorageError::Unsupported(_))
    ));

    let (_dir, file) = file_repository();
    assert!(matches!(
        file.ping().await,
        Err(StorageError::Unsupported(_))
    ));

    #[cfg(feature = "storage-sqlite")]
    {
        let (_dir, database) = database_repository().await;
        database.ping().await.unwrap();
    }
}

#[tokio::test]
async fn test_close_is_idempotent_everywhere() {
    let memory = memory_repository();
    memory.close().await.unwrap();
    memory.close().await.unwrap();

    let (_dir, file) = file_repository();
    file.close().await.unwrap();
    file.close().await.unwrap();
}

/// End-to-end scenario from the ingestion side: three PollCount increments
/// and one RandomValue gauge.
#[tokio::test]
async fn test_poll_count_scenario() {
    let repository = memory_repository();

    for _ in 0..3 {
        repository.counter("PollCount", 1).await.unwrap();
    }
    repository.replace_gauge("RandomValue", 0.5).await.unwrap();

    assert_eq!(
        repository
            .get_value(MetricKind::Counter, "PollCount")
            .await
            .unwrap(),
        MetricValue::Counter(3)
    );
    assert_eq!(
        repository
            .get_value(MetricKind::Gauge, "RandomValue")
            .await
            .unwrap(),
        MetricValue::Gauge(0.5)
    );
}
