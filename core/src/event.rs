//! Events as read by the projection engine from the append-only log.
//!
//! The engine treats the log as an external, read-only collaborator.
//! [`Event`] is the shape that crosses that boundary; the
//! engine itself never interprets `payload` — each concrete [`crate::Projection`]
//! parses the opaque JSON value through its own typed shape.

use crate::cursor::Cursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event read from the append-only event log.
///
/// Invariant (enforced by the log, not this crate): for a fixed
/// `aggregate_id`, `aggregate_version` is strictly increasing; across the
/// whole log, `(position, position_offset)` is strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position of this event in the log (see [`Cursor`]).
    pub position: f64,
    /// In-transaction disambiguator for events sharing `position`.
    pub position_offset: i32,
    /// The aggregate type this event belongs to (e.g. `"org"`, `"user"`).
    pub aggregate_type: String,
    /// The aggregate instance this event belongs to.
    pub aggregate_id: String,
    /// Monotonic per-aggregate sequence number.
    pub aggregate_version: i64,
    /// The event type string (e.g. `"org.added"`).
    pub event_type: String,
    /// Opaque, reducer-specific payload.
    pub payload: serde_json::Value,
    /// Who created the event (subject performing the write).
    pub creator: String,
    /// Who owns the affected resource.
    pub owner: String,
    /// The instance (tenant) this event belongs to.
    pub instance_id: String,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// This event's position in the log as a [`Cursor`].
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.position, self.position_offset)
    }

    /// A stable fingerprint of "this exact event", used as the cursor's
    /// `sequence` field for diagnostics (not used for comparison).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{}:{}@{}",
            self.aggregate_type, self.aggregate_id, self.aggregate_version, self.event_type
        )
    }
}

/// A filter describing which events a projection wants from the log.
///
/// Fields: `aggregateTypes`, `eventTypes`, `instanceID`,
/// `position > cursor`, `limit`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Accepted aggregate types. Empty means "any".
    pub aggregate_types: Vec<String>,
    /// Accepted event types. Empty means "any".
    pub event_types: Vec<String>,
    /// Restrict to a single instance (tenant), if set.
    pub instance_id: Option<Uuid>,
    /// Only return events strictly after this cursor.
    pub after: Cursor,
    /// Maximum number of events to return.
    pub limit: u32,
}

impl EventFilter {
    /// `true` if `event` matches this filter's `event_type`/`aggregate_type`
    /// predicate (the `position > cursor` and `limit` clauses are applied by
    /// the log reader itself, not here).
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let type_ok = self.event_types.is_empty()
            || self.event_types.iter().any(|t| t == &event.event_type);
        let aggregate_ok = self.aggregate_types.is_empty()
            || self
                .aggregate_types
                .iter()
                .any(|t| t == &event.aggregate_type);
        type_ok && aggregate_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(event_type: &str, aggregate_type: &str) -> Event {
        Event {
            position: 1.0,
            position_offset: 0,
            aggregate_type: aggregate_type.to_string(),
            aggregate_id: "agg-1".to_string(),
            aggregate_version: 1,
            event_type: event_type.to_string(),
            payload: serde_json::json!({}),
            creator: "system".to_string(),
            owner: "org-1".to_string(),
            instance_id: "instance-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filter_matches_declared_types() {
        let filter = EventFilter {
            aggregate_types: vec!["user".to_string()],
            event_types: vec!["user.added".to_string()],
            instance_id: None,
            after: Cursor::ORIGIN,
            limit: 10,
        };
        assert!(filter.matches(&sample_event("user.added", "user")));
        assert!(!filter.matches(&sample_event("org.added", "org")));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EventFilter {
            aggregate_types: vec![],
            event_types: vec![],
            instance_id: None,
            after: Cursor::ORIGIN,
            limit: 10,
        };
        assert!(filter.matches(&sample_event("anything", "anything")));
    }

    #[test]
    fn cursor_round_trips_position() {
        let event = sample_event("user.added", "user");
        assert_eq!(event.cursor(), Cursor::new(1.0, 0));
    }
}
