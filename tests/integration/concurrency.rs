//! Concurrency tests for the memory backend
//!
//! Mutation holds the exclusive lock for the whole read-modify-write, so
//! concurrent increments must never lose an update.

use metrics_hub::storage::Repository;
use metrics_hub::{MetricKind, MetricValue};

use crate::helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_counter_increments_lose_nothing() {
    let repository = memory_repository();

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let repository = repository.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                repository.counter("hits", 1).await.unwrap();
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(
        repository.get_value(MetricKind::Counter, "hits").await.unwrap(),
        MetricValue::Counter(1000)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_writers_across_kinds_and_ids() {
    let repository = memory_repository();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let repository = repository.clone();
        tasks.push(tokio::spawn(async move {
            for j in 0..10 {
                repository.counter(&format!("counter-{i}"), 1).await.unwrap();
                repository
                    .replace_gauge(&format!("gauge-{i}"), j as f64)
                    .await
                    .unwrap();
            }
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let all = repository.all().await.unwrap();
    assert_eq!(all.len(), 20);

    for i in 0..10 {
        assert_eq!(
            repository
                .get_value(MetricKind::Counter, &format!("counter-{i}"))
                .await
                .unwrap(),
            MetricValue::Counter(10)
        );
        assert_eq!(
            repository
                .get_value(MetricKind::Gauge, &format!("gauge-{i}"))
                .await
                .unwrap(),
            MetricValue::Gauge(9.0)
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_readers_see_consistent_copies_during_writes() {
    let repository = memory_repository();
    repository.counter("hits", 1).await.unwrap();

    let writer = {
        let repository = repository.clone();
        tokio::spawn(async move {
            for _ in 0..500 {
                repository.counter("hits", 1).await.unwrap();
            }
        })
    };

    let reader = {
        let repository = repository.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                // Snapshots are copies; every observed point must be
                // internally consistent.
                for point in repository.all().await.unwrap() {
                    point.validate().unwrap();
                }
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    assert_eq!(
        repository.get_value(MetricKind::Counter, "hits").await.unwrap(),
        MetricValue::Counter(501)
    );
}
