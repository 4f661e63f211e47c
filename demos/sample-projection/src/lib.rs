//! A concrete projection: reduces session-lifecycle events into a flat,
//! queryable `sessions` table.
//!
//! This crate exists to show what a real [`readmodel_core::Projection`]
//! looks like end to end — schema, reducer, registration — beyond the
//! test-only fixtures used inside the engine's own unit tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use readmodel_core::error::ReduceError;
use readmodel_core::event::Event;
use readmodel_core::projection::{Projection, Tx};
use serde::Deserialize;

/// Table this projection owns.
pub const TABLE: &str = "sessions";

/// Event types this projection understands.
pub const EVENT_TYPES: &[&str] = &[
    "session.added",
    "session.token_checked",
    "session.terminated",
];

#[derive(Debug, Deserialize)]
struct SessionAdded {
    user_id: String,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SessionTokenChecked {
    expires_at: DateTime<Utc>,
}

/// Reduces `session.*` events into the `sessions` table.
///
/// One row per session (`aggregate_id`), keyed by `id`. `session.added`
/// inserts the row; `session.token_checked` extends `expires_at`;
/// `session.terminated` stamps `terminated_at`. All three are no-ops on
/// redelivery before the cursor commits: each is a plain `UPDATE`/`UPSERT`
/// keyed on `id`, not an append.
pub struct SessionProjection;

impl Projection for SessionProjection {
    fn name(&self) -> &str {
        "session"
    }

    fn tables(&self) -> &[&str] {
        &[TABLE]
    }

    fn event_types(&self) -> &[&str] {
        EVENT_TYPES
    }

    fn aggregate_types(&self) -> &[&str] {
        &["session"]
    }

    async fn reduce(&self, event: &Event, tx: &mut Tx<'_>) -> Result<(), ReduceError> {
        match event.event_type.as_str() {
            "session.added" => self.apply_added(event, tx).await,
            "session.token_checked" => self.apply_token_checked(event, tx).await,
            "session.terminated" => self.apply_terminated(event, tx).await,
            other => Err(ReduceError::Other(format!(
                "session projection received unhandled event type {other}"
            ))),
        }
    }
}

impl SessionProjection {
    async fn apply_added(&self, event: &Event, tx: &mut Tx<'_>) -> Result<(), ReduceError> {
        let payload: SessionAdded = serde_json::from_value(event.payload.clone())
            .map_err(|e| ReduceError::InvalidPayload(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO sessions (id, instance_id, user_id, user_agent, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(&event.aggregate_id)
        .bind(&event.instance_id)
        .bind(&payload.user_id)
        .bind(&payload.user_agent)
        .bind(event.created_at)
        .bind(payload.expires_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| ReduceError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn apply_token_checked(&self, event: &Event, tx: &mut Tx<'_>) -> Result<(), ReduceError> {
        let payload: SessionTokenChecked = serde_json::from_value(event.payload.clone())
            .map_err(|e| ReduceError::InvalidPayload(e.to_string()))?;

        sqlx::query(
            r"
            UPDATE sessions SET expires_at = $2
            WHERE id = $1 AND terminated_at IS NULL
            ",
        )
        .bind(&event.aggregate_id)
        .bind(payload.expires_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| ReduceError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn apply_terminated(&self, event: &Event, tx: &mut Tx<'_>) -> Result<(), ReduceError> {
        sqlx::query(
            r"
            UPDATE sessions SET terminated_at = $2
            WHERE id = $1 AND terminated_at IS NULL
            ",
        )
        .bind(&event.aggregate_id)
        .bind(event.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| ReduceError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_its_table_and_event_types() {
        let projection = SessionProjection;
        assert_eq!(projection.tables(), &[TABLE]);
        assert_eq!(projection.event_types(), EVENT_TYPES);
        assert_eq!(projection.aggregate_types(), &["session"]);
        assert_eq!(projection.name(), "session");
    }
}
