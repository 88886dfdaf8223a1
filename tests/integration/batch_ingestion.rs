//! Batch ingestion semantics across backends
//!
//! A failing point aborts the surrounding batch everywhere, but durability
//! of the earlier points differs by design: memory and file backends keep
//! them, the database backend rolls the whole batch back.

use assert_matches::assert_matches;
use metrics_hub::storage::{Repository, StorageError};
use metrics_hub::{MetricKind, MetricPoint, MetricValue};

use crate::helpers::*;

fn batch_with_invalid_second_point() -> Vec<MetricPoint> {
    let invalid = MetricPoint {
        id: "broken".to_string(),
        kind: MetricKind::Counter,
        delta: None,
        value: None,
    };
    vec![
        MetricPoint::counter("applied-first", 5),
        invalid,
        MetricPoint::gauge("never-reached", 1.0),
    ]
}

#[tokio::test]
async fn test_valid_batch_applies_everywhere() {
    let batch = vec![
        MetricPoint::counter("polls", 2),
        MetricPoint::counter("polls", 3),
        MetricPoint::gauge("load", 0.75),
    ];

    let memory = memory_repository();
    memory.update_many(batch.clone()).await.unwrap();
    assert_eq!(
        memory.get_value(MetricKind::Counter, "polls").await.unwrap(),
        MetricValue::Counter(5)
    );

    let (_dir, file) = file_repository();
    file.update_many(batch.clone()).await.unwrap();
    assert_eq!(
        file.get_value(MetricKind::Gauge, "load").await.unwrap(),
        MetricValue::Gauge(0.75)
    );

    #[cfg(feature = "storage-sqlite")]
    {
        let (_dir, database) = database_repository().await;
        database.update_many(batch).await.unwrap();
        assert_eq!(
            database
                .get_value(MetricKind::Counter, "polls")
                .await
                .unwrap(),
            MetricValue::Counter(5)
        );
    }
}

#[tokio::test]
async fn test_memory_keeps_points_applied_before_the_failure() {
    let repository = memory_repository();

    let err = repository
        .update_many(batch_with_invalid_second_point())
        .await
        .unwrap_err();
    assert_matches!(err, StorageError::Validation(_));

    // Partial application, no rollback.
    assert_eq!(
        repository
            .get_value(MetricKind::Counter, "applied-first")
            .await
            .unwrap(),
        MetricValue::Counter(5)
    );
    assert!(
        repository
            .get_value(MetricKind::Gauge, "never-reached")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_file_keeps_points_applied_before_the_failure() {
    let (_dir, repository) = file_repository();

    let err = repository
        .update_many(batch_with_invalid_second_point())
        .await
        .unwrap_err();
    assert_matches!(err, StorageError::Validation(_));

    assert_eq!(
        repository
            .get_value(MetricKind::Counter, "applied-first")
            .await
            .unwrap(),
        MetricValue::Counter(5)
    );
}

#[cfg(feature = "storage-sqlite")]
#[tokio::test]
async fn test_database_rolls_back_the_whole_batch() {
    let (_dir, repository) = database_repository().await;

    let err = repository
        .update_many(batch_with_invalid_second_point())
        .await
        .unwrap_err();
    assert_matches!(err, StorageError::Validation(_));

    // All-or-nothing: even the valid leading point is gone.
    assert!(
        repository
            .get_value(MetricKind::Counter, "applied-first")
            .await
            .unwrap_err()
            .is_not_found()
    );
}
