//! PostgreSQL-backed current-state tracker.

use readmodel_core::cursor::Cursor;
use readmodel_core::error::StateTrackerError;
use readmodel_core::state_tracker::{CurrentStateTracker, CursorAdvance, ProjectionState};
use sqlx::{PgPool, Row};

/// Durable cursor storage backed by the `projection_states` table.
#[derive(Clone)]
pub struct PostgresCurrentStateTracker {
    pool: PgPool,
}

impl PostgresCurrentStateTracker {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CurrentStateTracker for PostgresCurrentStateTracker {
    async fn get(&self, name: &str) -> Result<Option<ProjectionState>, StateTrackerError> {
        let row = sqlx::query(
            r"
            SELECT name, position, position_offset, event_timestamp, updated_at,
                   instance_id, aggregate_type, aggregate_id, sequence
            FROM projection_states
            WHERE name = $1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateTrackerError::Storage(e.to_string()))?;

        Ok(row.map(|row| ProjectionState {
            name: row.get("name"),
            position: Cursor::new(row.get("position"), row.get("position_offset")),
            updated_at: row.get("updated_at"),
            event_timestamp: row.get("event_timestamp"),
            instance_id: row.get("instance_id"),
            aggregate_type: row.get("aggregate_type"),
            aggregate_id: row.get("aggregate_id"),
            sequence: row.get("sequence"),
        }))
    }

    async fn upsert(
        &self,
        name: &str,
        cursor: Cursor,
        advance: CursorAdvance,
    ) -> Result<bool, StateTrackerError> {
        // The WHERE clause on the UPDATE arm enforces the "cannot move
        // backward" invariant; combined with ON CONFLICT this makes the
        // whole upsert a no-op when the incoming cursor doesn't advance.
        let result = sqlx::query(
            r"
            INSERT INTO projection_states
                (name, position, position_offset, event_timestamp, updated_at,
                 instance_id, aggregate_type, aggregate_id, sequence)
            VALUES ($1, $2, $3, $4, now(), $5, $6, $7, $8)
            ON CONFLICT (name) DO UPDATE SET
                position = EXCLUDED.position,
                position_offset = EXCLUDED.position_offset,
                event_timestamp = EXCLUDED.event_timestamp,
                updated_at = now(),
                instance_id = EXCLUDED.instance_id,
                aggregate_type = EXCLUDED.aggregate_type,
                aggregate_id = EXCLUDED.aggregate_id,
                sequence = EXCLUDED.sequence
            WHERE (projection_states.position, projection_states.position_offset)
                < (EXCLUDED.position, EXCLUDED.position_offset)
            ",
        )
        .bind(name)
        .bind(cursor.position.0)
        .bind(cursor.position_offset)
        .bind(advance.event_timestamp)
        .bind(advance.instance_id)
        .bind(advance.aggregate_type)
        .bind(advance.aggregate_id)
        .bind(advance.sequence)
        .execute(&self.pool)
        .await
        .map_err(|e| StateTrackerError::Storage(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, name: &str) -> Result<(), StateTrackerError> {
        sqlx::query("DELETE FROM projection_states WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| StateTrackerError::Storage(e.to_string()))?;
        Ok(())
    }
}
