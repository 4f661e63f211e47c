//! Poison-event quarantine with retry accounting.

use crate::cursor::Cursor;
use crate::error::FailedEventLedgerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A quarantined event, keyed by `(projection_name, position)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedEvent {
    /// `"{projection_name}:{position}"`.
    pub id: String,
    /// The projection that failed to apply this event.
    pub projection_name: String,
    /// The event's cursor.
    pub position: Cursor,
    /// Number of times this event has failed (≥ 1, non-decreasing).
    pub failure_count: u32,
    /// Most recent error message.
    pub last_error: String,
    /// The event payload, serialized for out-of-band remediation.
    pub event_payload: serde_json::Value,
    /// Wall-clock time of the most recent failure.
    pub last_failed_at: DateTime<Utc>,
    /// Worker instance that recorded the most recent failure.
    pub instance_id: Option<String>,
}

/// Aggregate statistics over the failed-event ledger.
#[derive(Debug, Clone, Default)]
pub struct FailedEventStats {
    /// Total number of quarantined entries across all projections.
    pub total: u64,
    /// Per-projection counts.
    pub per_projection: Vec<(String, u64)>,
    /// Oldest `last_failed_at` across all entries.
    pub oldest_failure: Option<DateTime<Utc>>,
    /// Most recent `last_failed_at` across all entries.
    pub newest_failure: Option<DateTime<Utc>>,
}

/// Advisory record of per-event reducer failures.
///
/// The handler consults this ledger to decide whether an event has
/// exceeded `max_retries` and should be skipped rather than retried.
#[async_trait]
pub trait FailedEventLedger: Send + Sync {
    /// Record a failure for `(projection_name, position)`: insert with
    /// count 1, or increment and overwrite `last_error`/`last_failed_at` if
    /// an entry already exists. Returns the resulting `failure_count`.
    async fn record(
        &self,
        projection_name: &str,
        position: Cursor,
        event_payload: &serde_json::Value,
        error: &str,
        instance_id: Option<&str>,
    ) -> Result<u32, FailedEventLedgerError>;

    /// Look up a single quarantine entry.
    async fn get(
        &self,
        projection_name: &str,
        position: Cursor,
    ) -> Result<Option<FailedEvent>, FailedEventLedgerError>;

    /// All quarantine entries for a projection.
    async fn list(&self, projection_name: &str) -> Result<Vec<FailedEvent>, FailedEventLedgerError>;

    /// Entries whose `failure_count >= max_retries` (permanently failed).
    async fn list_permanently_failed(
        &self,
        projection_name: &str,
        max_retries: u32,
    ) -> Result<Vec<FailedEvent>, FailedEventLedgerError>;

    /// Remove the entry for `(projection_name, position)`, called after a
    /// successful re-apply.
    async fn remove_by_position(
        &self,
        projection_name: &str,
        position: Cursor,
    ) -> Result<(), FailedEventLedgerError>;

    /// Remove all entries for a projection (admin action).
    async fn clear(&self, projection_name: &str) -> Result<(), FailedEventLedgerError>;

    /// Global aggregate statistics across all projections.
    async fn stats(&self) -> Result<FailedEventStats, FailedEventLedgerError>;
}
