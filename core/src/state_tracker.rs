//! Durable per-projection cursor.

use crate::cursor::Cursor;
use crate::error::StateTrackerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A projection's durable cursor row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionState {
    /// Projection name (key).
    pub name: String,
    /// Last applied-or-skipped position.
    pub position: Cursor,
    /// Wall-clock time of the last cursor write.
    pub updated_at: DateTime<Utc>,
    /// Timestamp of the underlying event, if known.
    pub event_timestamp: Option<DateTime<Utc>>,
    /// Instance (tenant) the last event belonged to.
    pub instance_id: Option<String>,
    /// Aggregate type of the last event.
    pub aggregate_type: Option<String>,
    /// Aggregate id of the last event.
    pub aggregate_id: Option<String>,
    /// Fingerprint of the last applied-or-skipped event.
    pub sequence: Option<String>,
}

/// Fields describing the event a cursor advance is being written for.
///
/// this is written for the *current*
/// event regardless of whether it was successfully reduced or
/// quarantine-skipped.
#[derive(Debug, Clone, Default)]
pub struct CursorAdvance {
    /// Timestamp of the event being recorded.
    pub event_timestamp: Option<DateTime<Utc>>,
    /// Instance (tenant) of the event being recorded.
    pub instance_id: Option<String>,
    /// Aggregate type of the event being recorded.
    pub aggregate_type: Option<String>,
    /// Aggregate id of the event being recorded.
    pub aggregate_id: Option<String>,
    /// Fingerprint of the event being recorded.
    pub sequence: Option<String>,
}

/// Durable cursor and dedup-key tracker for projections.
///
/// All operations are single-statement; concurrent writers to the same
/// `name` are serialized by the underlying row lock.
#[async_trait]
pub trait CurrentStateTracker: Send + Sync {
    /// Latest known state for `name`, or `None` if it has never run.
    async fn get(&self, name: &str) -> Result<Option<ProjectionState>, StateTrackerError>;

    /// Atomic insert-or-update of the cursor.
    ///
    /// If `cursor` is lexicographically ≤ the stored cursor, this is a
    /// no-op and returns `false` (the cursor cannot go backward). Returns
    /// `true` if the write took effect.
    async fn upsert(
        &self,
        name: &str,
        cursor: Cursor,
        advance: CursorAdvance,
    ) -> Result<bool, StateTrackerError>;

    /// Delete the cursor row (used by `reset`/rebuild).
    async fn delete(&self, name: &str) -> Result<(), StateTrackerError>;

    /// `latest_position − stored.position`, or `latest_position` if there is
    /// no stored state yet.
    async fn lag(&self, name: &str, latest_position: f64) -> Result<f64, StateTrackerError> {
        Ok(match self.get(name).await? {
            Some(state) => (latest_position - state.position.position.0).max(0.0),
            None => latest_position,
        })
    }

    /// Poll (at a fixed ~100ms interval) until the stored cursor is ≥
    /// `target`, or `timeout` elapses.
    ///
    /// # Errors
    /// Returns [`StateTrackerError::Timeout`] if `target` is not reached in
    /// time. Treat this as "read-your-own-
    /// writes not guaranteed", not as a sign the projection is unhealthy.
    async fn wait_for_position(
        &self,
        name: &str,
        target: Cursor,
        timeout: Duration,
    ) -> Result<(), StateTrackerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut tick = tokio::time::interval(Duration::from_millis(100));
        loop {
            if let Some(state) = self.get(name).await? {
                if state.position >= target {
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StateTrackerError::Timeout {
                    projection: name.to_string(),
                    target: target.to_string(),
                });
            }
            tick.tick().await;
        }
    }
}
