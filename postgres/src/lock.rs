//! PostgreSQL-backed leased mutual exclusion.

use chrono::{DateTime, Utc};
use readmodel_core::error::LockError;
use readmodel_core::lock::{ProjectionLock, ProjectionLockStore};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

/// Lease storage backed by the `projection_locks` table.
#[derive(Clone)]
pub struct PostgresProjectionLockStore {
    pool: PgPool,
}

impl PostgresProjectionLockStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProjectionLockStore for PostgresProjectionLockStore {
    async fn try_acquire(
        &self,
        projection_name: &str,
        holder_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        #[allow(clippy::cast_possible_wrap)]
        let ttl_seconds = ttl.as_secs() as i64;

        // Either there is no row yet, or the existing lease has expired;
        // in both cases we may reclaim it. A live lease held by someone
        // else is left untouched.
        let result = sqlx::query(
            r"
            INSERT INTO projection_locks (projection_name, instance_id, acquired_at, expires_at)
            VALUES ($1, $2, now(), now() + make_interval(secs => $3))
            ON CONFLICT (projection_name) DO UPDATE SET
                instance_id = EXCLUDED.instance_id,
                acquired_at = now(),
                expires_at = now() + make_interval(secs => $3)
            WHERE projection_locks.expires_at < now()
               OR projection_locks.instance_id = EXCLUDED.instance_id
            ",
        )
        .bind(projection_name)
        .bind(holder_id)
        .bind(ttl_seconds as f64)
        .execute(&self.pool)
        .await
        .map_err(|e| LockError::Storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn renew(
        &self,
        projection_name: &str,
        holder_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        #[allow(clippy::cast_possible_wrap)]
        let ttl_seconds = ttl.as_secs() as i64;

        let result = sqlx::query(
            r"
            UPDATE projection_locks
            SET expires_at = now() + make_interval(secs => $3)
            WHERE projection_name = $1 AND instance_id = $2
            ",
        )
        .bind(projection_name)
        .bind(holder_id)
        .bind(ttl_seconds as f64)
        .execute(&self.pool)
        .await
        .map_err(|e| LockError::Storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, projection_name: &str, holder_id: Uuid) -> Result<(), LockError> {
        let result = sqlx::query(
            "DELETE FROM projection_locks WHERE projection_name = $1 AND instance_id = $2",
        )
        .bind(projection_name)
        .bind(holder_id)
        .execute(&self.pool)
        .await
        .map_err(|e| LockError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(LockError::NotHeld(projection_name.to_string()));
        }
        Ok(())
    }

    async fn get(&self, projection_name: &str) -> Result<Option<ProjectionLock>, LockError> {
        let row = sqlx::query(
            "SELECT projection_name, instance_id, acquired_at, expires_at
             FROM projection_locks WHERE projection_name = $1",
        )
        .bind(projection_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LockError::Storage(e.to_string()))?;

        Ok(row.map(|row| ProjectionLock {
            projection_name: row.get("projection_name"),
            holder_id: row.get("instance_id"),
            acquired_at: row.get::<DateTime<Utc>, _>("acquired_at"),
            expires_at: row.get::<DateTime<Utc>, _>("expires_at"),
        }))
    }

    async fn cleanup_expired(&self) -> Result<u64, LockError> {
        let result = sqlx::query("DELETE FROM projection_locks WHERE expires_at < now()")
            .execute(&self.pool)
            .await
            .map_err(|e| LockError::Storage(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
