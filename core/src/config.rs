//! Immutable, per-projection configuration.

use std::time::Duration;
use uuid::Uuid;

/// Configuration for a single registered projection. Immutable after
/// registration; the registry rejects re-registration under
/// the same name with a different config.
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Stable, unique projection name. Must match `Projection::name()`.
    pub name: String,
    /// Target tables this projection writes to (used by `reset` to truncate).
    pub tables: Vec<String>,
    /// Event types this projection's reducer understands.
    pub event_types: Vec<String>,
    /// Aggregate types this projection cares about. Empty means "any".
    pub aggregate_types: Vec<String>,
    /// Maximum number of events fetched per batch.
    pub batch_size: u32,
    /// Delay between ticks when the previous batch was not full.
    pub interval: Duration,
    /// Number of failures before an event is quarantined permanently.
    pub max_retries: u32,
    /// Delay before retrying a batch that left the cursor unmoved.
    pub retry_delay: Duration,
    /// Whether to take the distributed lease lock before making progress.
    pub enable_locking: bool,
    /// Lease TTL for the distributed lock, when `enable_locking` is set.
    pub lock_ttl: Duration,
    /// Restrict processing to events from a single instance (tenant).
    pub instance_id: Option<Uuid>,
    /// Starting position for a brand new projection (defaults to origin).
    pub start_position: Option<(f64, i32)>,
    /// Truncate tables and delete the cursor before starting.
    pub rebuild_on_start: bool,
    /// Consecutive batch-level errors (transient reducer failures or
    /// storage-layer faults) before the handler gives up and transitions
    /// to `Error`. Resets to zero on any successful batch.
    pub max_consecutive_errors: u32,
}

impl ProjectionConfig {
    /// Start building a config for `name` with the engine's defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            event_types: Vec::new(),
            aggregate_types: Vec::new(),
            batch_size: 100,
            interval: Duration::from_secs(1),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            enable_locking: true,
            lock_ttl: Duration::from_secs(60),
            instance_id: None,
            start_position: None,
            rebuild_on_start: false,
            max_consecutive_errors: 10,
        }
    }

    /// Tables this projection owns.
    #[must_use]
    pub fn with_tables(mut self, tables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Event types this projection's reducer accepts.
    #[must_use]
    pub fn with_event_types(
        mut self,
        event_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.event_types = event_types.into_iter().map(Into::into).collect();
        self
    }

    /// Override the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Override the tick interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Disable distributed locking (single-instance deployments/tests).
    #[must_use]
    pub const fn without_locking(mut self) -> Self {
        self.enable_locking = false;
        self
    }

    /// Override how many consecutive batch errors are tolerated before the
    /// handler transitions to `Error`.
    #[must_use]
    pub const fn with_max_consecutive_errors(mut self, max_consecutive_errors: u32) -> Self {
        self.max_consecutive_errors = max_consecutive_errors;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ProjectionConfig::new("session");
        assert_eq!(config.name, "session");
        assert!(config.enable_locking);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_consecutive_errors, 10);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ProjectionConfig::new("session")
            .with_tables(["sessions"])
            .with_event_types(["session.added"])
            .with_batch_size(50)
            .without_locking();
        assert_eq!(config.tables, vec!["sessions".to_string()]);
        assert_eq!(config.event_types, vec!["session.added".to_string()]);
        assert_eq!(config.batch_size, 50);
        assert!(!config.enable_locking);
    }
}
