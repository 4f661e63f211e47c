//! In-memory fakes for the four storage traits, for fast deterministic
//! tests of handler and registry logic without a database.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use readmodel_core::cursor::Cursor;
use readmodel_core::error::{FailedEventLedgerError, LockError, LogReaderError, StateTrackerError};
use readmodel_core::event::{Event, EventFilter};
use readmodel_core::failed_event::{FailedEvent, FailedEventLedger, FailedEventStats};
use readmodel_core::lock::{ProjectionLock, ProjectionLockStore};
use readmodel_core::log_reader::EventLogReader;
use readmodel_core::state_tracker::{CurrentStateTracker, CursorAdvance, ProjectionState};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

/// A fixed, append-only in-memory event log.
///
/// Built once via [`Self::new`] from a `Vec<Event>`; queries never mutate
/// it, matching the real log's read-only role from the engine's
/// perspective.
#[derive(Debug)]
pub struct FakeEventLog {
    events: Vec<Event>,
}

impl FakeEventLog {
    /// Build a log from events already in log order.
    #[must_use]
    pub const fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[async_trait::async_trait]
impl EventLogReader for FakeEventLog {
    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, LogReaderError> {
        Ok(self
            .events
            .iter()
            .filter(|event| event.cursor() > filter.after && filter.matches(event))
            .filter(|event| {
                filter.instance_id.is_none_or(|id| event.instance_id == id.to_string())
            })
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn latest_position(&self) -> Result<Option<f64>, LogReaderError> {
        Ok(self.events.last().map(|event| event.position))
    }
}

/// In-memory [`CurrentStateTracker`].
#[derive(Debug, Default)]
pub struct FakeStateTracker {
    states: RwLock<HashMap<String, ProjectionState>>,
}

impl FakeStateTracker {
    /// An empty tracker, as if no projection had ever run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CurrentStateTracker for FakeStateTracker {
    async fn get(&self, name: &str) -> Result<Option<ProjectionState>, StateTrackerError> {
        Ok(self.states.read().unwrap().get(name).cloned())
    }

    async fn upsert(
        &self,
        name: &str,
        cursor: Cursor,
        advance: CursorAdvance,
    ) -> Result<bool, StateTrackerError> {
        let mut states = self.states.write().unwrap();
        let advances = match states.get(name) {
            Some(existing) if existing.position >= cursor => false,
            _ => true,
        };
        if advances {
            states.insert(
                name.to_string(),
                ProjectionState {
                    name: name.to_string(),
                    position: cursor,
                    updated_at: Utc::now(),
                    event_timestamp: advance.event_timestamp,
                    instance_id: advance.instance_id,
                    aggregate_type: advance.aggregate_type,
                    aggregate_id: advance.aggregate_id,
                    sequence: advance.sequence,
                },
            );
        }
        Ok(advances)
    }

    async fn delete(&self, name: &str) -> Result<(), StateTrackerError> {
        self.states.write().unwrap().remove(name);
        Ok(())
    }
}

/// In-memory [`FailedEventLedger`].
#[derive(Debug, Default)]
pub struct FakeFailedEventLedger {
    entries: RwLock<HashMap<(String, String), FailedEvent>>,
}

impl FakeFailedEventLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(projection_name: &str, position: Cursor) -> (String, String) {
        (projection_name.to_string(), position.to_string())
    }
}

#[async_trait::async_trait]
impl FailedEventLedger for FakeFailedEventLedger {
    async fn record(
        &self,
        projection_name: &str,
        position: Cursor,
        event_payload: &serde_json::Value,
        error: &str,
        instance_id: Option<&str>,
    ) -> Result<u32, FailedEventLedgerError> {
        let key = Self::key(projection_name, position);
        let mut entries = self.entries.write().unwrap();
        let failure_count = entries.get(&key).map_or(1, |entry| entry.failure_count + 1);
        entries.insert(
            key.clone(),
            FailedEvent {
                id: format!("{}:{}", key.0, key.1),
                projection_name: projection_name.to_string(),
                position,
                failure_count,
                last_error: error.to_string(),
                event_payload: event_payload.clone(),
                last_failed_at: Utc::now(),
                instance_id: instance_id.map(ToString::to_string),
            },
        );
        Ok(failure_count)
    }

    async fn get(
        &self,
        projection_name: &str,
        position: Cursor,
    ) -> Result<Option<FailedEvent>, FailedEventLedgerError> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .get(&Self::key(projection_name, position))
            .cloned())
    }

    async fn list(&self, projection_name: &str) -> Result<Vec<FailedEvent>, FailedEventLedgerError> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.projection_name == projection_name)
            .cloned()
            .collect())
    }

    async fn list_permanently_failed(
        &self,
        projection_name: &str,
        max_retries: u32,
    ) -> Result<Vec<FailedEvent>, FailedEventLedgerError> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .values()
            .filter(|entry| entry.projection_name == projection_name && entry.failure_count >= max_retries)
            .cloned()
            .collect())
    }

    async fn remove_by_position(
        &self,
        projection_name: &str,
        position: Cursor,
    ) -> Result<(), FailedEventLedgerError> {
        self.entries
            .write()
            .unwrap()
            .remove(&Self::key(projection_name, position));
        Ok(())
    }

    async fn clear(&self, projection_name: &str) -> Result<(), FailedEventLedgerError> {
        self.entries
            .write()
            .unwrap()
            .retain(|_, entry| entry.projection_name != projection_name);
        Ok(())
    }

    async fn stats(&self) -> Result<FailedEventStats, FailedEventLedgerError> {
        let entries = self.entries.read().unwrap();
        let mut per_projection: HashMap<String, u64> = HashMap::new();
        for entry in entries.values() {
            *per_projection.entry(entry.projection_name.clone()).or_default() += 1;
        }
        Ok(FailedEventStats {
            total: entries.len() as u64,
            per_projection: per_projection.into_iter().collect(),
            oldest_failure: entries.values().map(|e| e.last_failed_at).min(),
            newest_failure: entries.values().map(|e| e.last_failed_at).max(),
        })
    }
}

/// In-memory [`ProjectionLockStore`].
#[derive(Debug, Default)]
pub struct FakeLockStore {
    locks: RwLock<HashMap<String, ProjectionLock>>,
}

impl FakeLockStore {
    /// No leases held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProjectionLockStore for FakeLockStore {
    async fn try_acquire(
        &self,
        projection_name: &str,
        holder_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let mut locks = self.locks.write().unwrap();
        let now = Utc::now();
        let reclaimable = locks
            .get(projection_name)
            .is_none_or(|lock| lock.expires_at < now || lock.holder_id == holder_id);
        if reclaimable {
            locks.insert(
                projection_name.to_string(),
                ProjectionLock {
                    projection_name: projection_name.to_string(),
                    holder_id,
                    acquired_at: now,
                    expires_at: now + ttl,
                },
            );
        }
        Ok(reclaimable)
    }

    async fn renew(
        &self,
        projection_name: &str,
        holder_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let mut locks = self.locks.write().unwrap();
        match locks.get_mut(projection_name) {
            Some(lock) if lock.holder_id == holder_id => {
                lock.expires_at = Utc::now() + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, projection_name: &str, holder_id: Uuid) -> Result<(), LockError> {
        let mut locks = self.locks.write().unwrap();
        match locks.get(projection_name) {
            Some(lock) if lock.holder_id == holder_id => {
                locks.remove(projection_name);
                Ok(())
            }
            _ => Err(LockError::NotHeld(projection_name.to_string())),
        }
    }

    async fn get(&self, projection_name: &str) -> Result<Option<ProjectionLock>, LockError> {
        Ok(self.locks.read().unwrap().get(projection_name).cloned())
    }

    async fn cleanup_expired(&self) -> Result<u64, LockError> {
        let mut locks = self.locks.write().unwrap();
        let now = Utc::now();
        let before = locks.len();
        locks.retain(|_, lock| lock.expires_at >= now);
        Ok((before - locks.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(position: f64, event_type: &str) -> Event {
        Event {
            position,
            position_offset: 0,
            aggregate_type: "session".to_string(),
            aggregate_id: "s-1".to_string(),
            aggregate_version: 1,
            event_type: event_type.to_string(),
            payload: serde_json::json!({}),
            creator: "tester".to_string(),
            owner: "tester".to_string(),
            instance_id: "inst-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fake_log_respects_after_cursor_and_limit() {
        let log = FakeEventLog::new(vec![
            event(1.0, "a"),
            event(2.0, "b"),
            event(3.0, "c"),
        ]);
        let filter = EventFilter {
            after: Cursor::new(1.0, 0),
            limit: 1,
            ..EventFilter::default()
        };
        let events = log.query(&filter).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "b");
    }

    #[tokio::test]
    async fn fake_state_tracker_rejects_non_advancing_upsert() {
        let tracker = FakeStateTracker::new();
        assert!(tracker
            .upsert("p", Cursor::new(5.0, 0), CursorAdvance::default())
            .await
            .unwrap());
        assert!(!tracker
            .upsert("p", Cursor::new(1.0, 0), CursorAdvance::default())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn fake_lock_store_blocks_second_holder() {
        let locks = FakeLockStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(locks.try_acquire("p", a, Duration::from_secs(30)).await.unwrap());
        assert!(!locks.try_acquire("p", b, Duration::from_secs(30)).await.unwrap());
    }

    #[tokio::test]
    async fn fake_ledger_increments_failure_count() {
        let ledger = FakeFailedEventLedger::new();
        let position = Cursor::new(1.0, 0);
        let first = ledger
            .record("p", position, &serde_json::json!({}), "boom", None)
            .await
            .unwrap();
        let second = ledger
            .record("p", position, &serde_json::json!({}), "boom again", None)
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }
}
