//! Small builders for constructing sample events in tests.

use chrono::Utc;
use readmodel_core::event::Event;

/// Build an [`Event`] with sensible defaults, overriding only what a test
/// cares about.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Event,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self {
            event: Event {
                position: 1.0,
                position_offset: 0,
                aggregate_type: "session".to_string(),
                aggregate_id: "agg-1".to_string(),
                aggregate_version: 1,
                event_type: "session.created".to_string(),
                payload: serde_json::json!({}),
                creator: "tester".to_string(),
                owner: "tester".to_string(),
                instance_id: "instance-1".to_string(),
                created_at: Utc::now(),
            },
        }
    }
}

impl EventBuilder {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `(position, position_offset)`.
    #[must_use]
    pub const fn position(mut self, position: f64, offset: i32) -> Self {
        self.event.position = position;
        self.event.position_offset = offset;
        self
    }

    /// Set `event_type`.
    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event.event_type = event_type.into();
        self
    }

    /// Set `aggregate_type` and `aggregate_id`.
    #[must_use]
    pub fn aggregate(mut self, aggregate_type: impl Into<String>, aggregate_id: impl Into<String>) -> Self {
        self.event.aggregate_type = aggregate_type.into();
        self.event.aggregate_id = aggregate_id.into();
        self
    }

    /// Set `payload`.
    #[must_use]
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.event.payload = payload;
        self
    }

    /// Set `instance_id`.
    #[must_use]
    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.event.instance_id = instance_id.into();
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Event {
        self.event
    }
}

/// A run of `count` events at positions `1.0..=count`, same aggregate and
/// event type, for tests that just need "some events in order".
#[must_use]
pub fn sequential_events(count: usize, event_type: &str) -> Vec<Event> {
    (1..=count)
        .map(|i| {
            EventBuilder::new()
                .position(i as f64, 0)
                .event_type(event_type)
                .build()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let event = EventBuilder::new()
            .position(3.0, 1)
            .event_type("session.expired")
            .aggregate("session", "sess-9")
            .build();
        assert_eq!(event.position, 3.0);
        assert_eq!(event.position_offset, 1);
        assert_eq!(event.event_type, "session.expired");
        assert_eq!(event.aggregate_id, "sess-9");
    }

    #[test]
    fn sequential_events_are_strictly_ordered() {
        let events = sequential_events(5, "tick");
        for pair in events.windows(2) {
            assert!(pair[0].position < pair[1].position);
        }
    }
}
