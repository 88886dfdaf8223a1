//! SQLite storage backend implementation
//!
//! Mutating operations are single upsert statements keyed by the unique
//! `(name, kind)` pair: counters are merged at the database layer (no
//! read-modify-write in the application), gauges are overwritten. Bulk
//! import runs inside one transaction and rolls back entirely on the first
//! failure, unlike the per-point application of the memory and file
//! backends.
//!
//! Concurrency correctness is delegated to the database engine's own
//! locking; the pool is owned by this backend for the process lifetime and
//! released in `close`.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::error::{StorageError, StorageResult};
use super::repository::Repository;
use crate::retry::{RetryError, RetryPolicy};
use crate::{MetricKind, MetricPoint, MetricValue};

/// SQLite storage backend
pub struct DatabaseBackend {
    pool: Pool<Sqlite>,
}

impl DatabaseBackend {
    /// Connect to the database file, creating it and running migrations if
    /// needed. Connection establishment is wrapped in the database retry
    /// policy; query errors during migration are fatal.
    #[instrument(skip_all)]
    pub async fn connect(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref();

        info!("initializing database backend at {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let policy = RetryPolicy::for_database();
        let pool = match policy
            .run(|| async {
                SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options.clone())
                    .await
                    .map_err(|e| StorageError::ConnectionFailed(e.to_string()))
            })
            .await
        {
            Ok(pool) => pool,
            Err(RetryError::Fatal(err)) => return Err(err),
            Err(err @ RetryError::Exhausted { .. }) => {
                return Err(StorageError::ConnectionFailed(err.to_string()));
            }
        };

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    fn row_to_point(kind: MetricKind, row: &sqlx::sqlite::SqliteRow) -> MetricPoint {
        MetricPoint {
            id: row.get("name"),
            kind,
            delta: row.get("delta"),
            value: row.get("value"),
        }
    }
}

#[async_trait]
impl Repository for DatabaseBackend {
    #[instrument(skip(self))]
    async fn counter(&self, id: &str, delta: i64) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO metrics (name, kind, delta) VALUES (?, ?, ?)
            ON CONFLICT (name, kind)
            DO UPDATE SET delta = COALESCE(delta, 0) + excluded.delta
            "#,
        )
        .bind(id)
        .bind(MetricKind::Counter.to_string())
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(
                "counter metric is not changed".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn replace_gauge(&self, id: &str, value: f64) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO metrics (name, kind, value) VALUES (?, ?, ?)
            ON CONFLICT (name, kind) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(id)
        .bind(MetricKind::Gauge.to_string())
        .bind(value)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::QueryFailed(
                "gauge metric is not changed".to_string(),
            ));
        }
        Ok(())
    }

    async fn get_value(&self, kind: MetricKind, id: &str) -> StorageResult<MetricValue> {
        let point = self.get_metric(kind, id).await?;
        super::point_value(&point)
    }

    async fn get_metric(&self, kind: MetricKind, id: &str) -> StorageResult<MetricPoint> {
        let row = sqlx::query(
            "SELECT name, value, delta FROM metrics WHERE name = ? AND kind = ? LIMIT 1",
        )
        .bind(id)
        .bind(kind.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Self::row_to_point(kind, &row)),
            None => Err(StorageError::NotFound {
                kind,
                id: id.to_string(),
            }),
        }
    }

    async fn all(&self) -> StorageResult<Vec<MetricPoint>> {
        let rows = sqlx::query("SELECT name, kind, value, delta FROM metrics")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let kind: MetricKind = row.get::<String, _>("kind").parse()?;
                Ok(Self::row_to_point(kind, row))
            })
            .collect()
    }

    #[instrument(skip(self, points), fields(count = points.len()))]
    async fn load(&self, points: Vec<MetricPoint>) -> StorageResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        // Any failed row aborts the whole transaction via drop-rollback.
        let mut tx = self.pool.begin().await?;

        for point in points {
            sqlx::query(
                r#"
                INSERT INTO metrics (name, kind, value, delta) VALUES (?, ?, ?, ?)
                ON CONFLICT (name, kind)
                DO UPDATE SET value = excluded.value, delta = excluded.delta
                "#,
            )
            .bind(&point.id)
            .bind(point.kind.to_string())
            .bind(point.value)
            .bind(point.delta)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, points), fields(count = points.len()))]
    async fn update_many(&self, points: Vec<MetricPoint>) -> StorageResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for point in points {
            point.validate()?;
            match point.kind {
                MetricKind::Counter => {
                    sqlx::query(
                        r#"
                        INSERT INTO metrics (name, kind, delta) VALUES (?, ?, ?)
                        ON CONFLICT (name, kind)
                        DO UPDATE SET delta = COALESCE(delta, 0) + excluded.delta
                        "#,
                    )
                    .bind(&point.id)
                    .bind(point.kind.to_string())
                    .bind(point.delta)
                    .execute(&mut *tx)
                    .await?;
                }
                MetricKind::Gauge => {
                    sqlx::query(
                        r#"
                        INSERT INTO metrics (name, kind, value) VALUES (?, ?, ?)
                        ON CONFLICT (name, kind) DO UPDATE SET value = excluded.value
                        "#,
                    )
                    .bind(&point.id)
                    .bind(point.kind.to_string())
                    .bind(point.value)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing database backend");
        self.pool.close().await;
        Ok(())
    }
}
