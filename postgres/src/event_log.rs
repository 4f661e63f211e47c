//! Read-only query interface over the external `events` table.
//!
//! The table itself is owned and written by the command/write side,
//! which is out of scope here; this reader only ever issues `SELECT`s
//! against it.

use chrono::{DateTime, Utc};
use readmodel_core::error::LogReaderError;
use readmodel_core::event::{Event, EventFilter};
use readmodel_core::log_reader::EventLogReader;
use sqlx::{PgPool, Row};

/// Reads events from the external `events` table, ordered by
/// `(position, in_tx_order)`.
#[derive(Clone)]
pub struct PostgresEventLogReader {
    pool: PgPool,
}

impl PostgresEventLogReader {
    /// Wrap an existing connection pool (typically pointed at the
    /// write-side database, since read and write live in the same
    /// Postgres instance here).
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventLogReader for PostgresEventLogReader {
    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, LogReaderError> {
        #[allow(clippy::cast_possible_wrap)]
        let limit = i64::from(filter.limit);
        let aggregate_types: Option<Vec<String>> = (!filter.aggregate_types.is_empty())
            .then(|| filter.aggregate_types.clone());
        let event_types: Option<Vec<String>> =
            (!filter.event_types.is_empty()).then(|| filter.event_types.clone());
        let instance_id = filter.instance_id.map(|id| id.to_string());

        let rows = sqlx::query(
            r"
            SELECT position, in_tx_order, aggregate_type, aggregate_id, aggregate_version,
                   event_type, payload, creator, owner, instance_id, created_at
            FROM events
            WHERE (position, in_tx_order) > ($1, $2)
              AND ($3::text[] IS NULL OR aggregate_type = ANY($3))
              AND ($4::text[] IS NULL OR event_type = ANY($4))
              AND ($5::text IS NULL OR instance_id = $5)
            ORDER BY position ASC, in_tx_order ASC
            LIMIT $6
            ",
        )
        .bind(filter.after.position.0)
        .bind(filter.after.position_offset)
        .bind(aggregate_types)
        .bind(event_types)
        .bind(instance_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LogReaderError::Storage(e.to_string()))?;

        rows.iter().map(row_to_event).collect()
    }

    async fn latest_position(&self) -> Result<Option<f64>, LogReaderError> {
        let row = sqlx::query("SELECT MAX(position) AS position FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LogReaderError::Storage(e.to_string()))?;
        Ok(row.get::<Option<f64>, _>("position"))
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event, LogReaderError> {
    let created_at: DateTime<Utc> = row.get("created_at");
    Ok(Event {
        position: row.get("position"),
        position_offset: row.get("in_tx_order"),
        aggregate_type: row.get("aggregate_type"),
        aggregate_id: row.get("aggregate_id"),
        aggregate_version: row.get("aggregate_version"),
        event_type: row.get("event_type"),
        payload: row.get("payload"),
        creator: row.get("creator"),
        owner: row.get("owner"),
        instance_id: row.get("instance_id"),
        created_at,
    })
}
