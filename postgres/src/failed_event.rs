//! PostgreSQL-backed failed-event ledger.
//!
//! Insert-or-increment shape with `tracing`/`metrics` observability,
//! keyed by `(projection_name, position)` instead of a generic
//! `stream_id`.

use chrono::Utc;
use readmodel_core::cursor::Cursor;
use readmodel_core::error::FailedEventLedgerError;
use readmodel_core::failed_event::{FailedEvent, FailedEventLedger, FailedEventStats};
use sqlx::{PgPool, Row};

/// Quarantine storage backed by the `projection_failed_events` table.
#[derive(Clone)]
pub struct PostgresFailedEventLedger {
    pool: PgPool,
}

impl PostgresFailedEventLedger {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn entry_id(projection_name: &str, position: Cursor) -> String {
        format!("{projection_name}:{}", position.position.0)
    }
}

#[async_trait::async_trait]
impl FailedEventLedger for PostgresFailedEventLedger {
    async fn record(
        &self,
        projection_name: &str,
        position: Cursor,
        event_payload: &serde_json::Value,
        error: &str,
        instance_id: Option<&str>,
    ) -> Result<u32, FailedEventLedgerError> {
        let id = Self::entry_id(projection_name, position);

        let row = sqlx::query(
            r"
            INSERT INTO projection_failed_events
                (id, projection_name, position, position_offset, failure_count,
                 error, event_data, last_failed, instance_id)
            VALUES ($1, $2, $3, $4, 1, $5, $6, now(), $7)
            ON CONFLICT (projection_name, position, position_offset) DO UPDATE SET
                failure_count = projection_failed_events.failure_count + 1,
                error = EXCLUDED.error,
                last_failed = now(),
                instance_id = EXCLUDED.instance_id
            RETURNING failure_count
            ",
        )
        .bind(&id)
        .bind(projection_name)
        .bind(position.position.0)
        .bind(position.position_offset)
        .bind(error)
        .bind(event_payload)
        .bind(instance_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;

        let failure_count: i32 = row.get("failure_count");

        tracing::warn!(
            projection = projection_name,
            position = position.to_string(),
            failure_count,
            error,
            "event quarantined"
        );
        metrics::counter!("projection_engine.event.quarantined", "projection" => projection_name.to_string())
            .increment(1);

        #[allow(clippy::cast_sign_loss)]
        Ok(failure_count as u32)
    }

    async fn get(
        &self,
        projection_name: &str,
        position: Cursor,
    ) -> Result<Option<FailedEvent>, FailedEventLedgerError> {
        let row = sqlx::query(
            r"
            SELECT id, projection_name, position, position_offset, failure_count,
                   error, event_data, last_failed, instance_id
            FROM projection_failed_events
            WHERE projection_name = $1 AND position = $2 AND position_offset = $3
            ",
        )
        .bind(projection_name)
        .bind(position.position.0)
        .bind(position.position_offset)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;

        row.map(|row| row_to_failed_event(&row)).transpose()
    }

    async fn list(&self, projection_name: &str) -> Result<Vec<FailedEvent>, FailedEventLedgerError> {
        let rows = sqlx::query(
            r"
            SELECT id, projection_name, position, position_offset, failure_count,
                   error, event_data, last_failed, instance_id
            FROM projection_failed_events
            WHERE projection_name = $1
            ORDER BY position ASC, position_offset ASC
            ",
        )
        .bind(projection_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;

        rows.iter().map(row_to_failed_event).collect()
    }

    async fn list_permanently_failed(
        &self,
        projection_name: &str,
        max_retries: u32,
    ) -> Result<Vec<FailedEvent>, FailedEventLedgerError> {
        #[allow(clippy::cast_possible_wrap)]
        let max_retries = i32::from(max_retries as u16);
        let rows = sqlx::query(
            r"
            SELECT id, projection_name, position, position_offset, failure_count,
                   error, event_data, last_failed, instance_id
            FROM projection_failed_events
            WHERE projection_name = $1 AND failure_count >= $2
            ORDER BY position ASC, position_offset ASC
            ",
        )
        .bind(projection_name)
        .bind(max_retries)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;

        rows.iter().map(row_to_failed_event).collect()
    }

    async fn remove_by_position(
        &self,
        projection_name: &str,
        position: Cursor,
    ) -> Result<(), FailedEventLedgerError> {
        sqlx::query(
            "DELETE FROM projection_failed_events
             WHERE projection_name = $1 AND position = $2 AND position_offset = $3",
        )
        .bind(projection_name)
        .bind(position.position.0)
        .bind(position.position_offset)
        .execute(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, projection_name: &str) -> Result<(), FailedEventLedgerError> {
        sqlx::query("DELETE FROM projection_failed_events WHERE projection_name = $1")
            .bind(projection_name)
            .execute(&self.pool)
            .await
            .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn stats(&self) -> Result<FailedEventStats, FailedEventLedgerError> {
        let total_row = sqlx::query("SELECT COUNT(*) AS total FROM projection_failed_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;
        let total: i64 = total_row.get("total");

        let per_projection_rows = sqlx::query(
            r"
            SELECT projection_name, COUNT(*) AS count
            FROM projection_failed_events
            GROUP BY projection_name
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;

        let per_projection = per_projection_rows
            .iter()
            .map(|row| {
                let count: i64 = row.get("count");
                #[allow(clippy::cast_sign_loss)]
                (row.get::<String, _>("projection_name"), count as u64)
            })
            .collect();

        let range_row = sqlx::query(
            r"
            SELECT MIN(last_failed) AS oldest, MAX(last_failed) AS newest
            FROM projection_failed_events
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FailedEventLedgerError::Storage(e.to_string()))?;

        #[allow(clippy::cast_sign_loss)]
        Ok(FailedEventStats {
            total: total as u64,
            per_projection,
            oldest_failure: range_row.get("oldest"),
            newest_failure: range_row.get("newest"),
        })
    }
}

fn row_to_failed_event(row: &sqlx::postgres::PgRow) -> Result<FailedEvent, FailedEventLedgerError> {
    let failure_count: i32 = row.get("failure_count");
    Ok(FailedEvent {
        id: row.get("id"),
        projection_name: row.get("projection_name"),
        position: Cursor::new(row.get("position"), row.get("position_offset")),
        #[allow(clippy::cast_sign_loss)]
        failure_count: failure_count as u32,
        last_error: row.get("error"),
        event_payload: row.get("event_data"),
        last_failed_at: row.get::<chrono::DateTime<Utc>, _>("last_failed"),
        instance_id: row.get("instance_id"),
    })
}
