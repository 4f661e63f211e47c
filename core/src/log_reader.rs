//! Read interface over the append-only event log.
//!
//! The core consumes only `query` and `latest_position`; everything else
//! about the log (how it is written, its physical schema) is external.

use crate::error::LogReaderError;
use crate::event::{Event, EventFilter};
use async_trait::async_trait;

/// Query interface over the append-only event table.
///
/// Implementations must return events ordered strictly by
/// `(position, position_offset)`, honoring `filter.limit`.
#[async_trait]
pub trait EventLogReader: Send + Sync {
    /// Fetch up to `filter.limit` events past `filter.after`, matching the
    /// filter's type predicates, ordered by `(position, position_offset)`.
    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, LogReaderError>;

    /// The position of the most recent event in the log (the "head"), used
    /// to compute lag. Returns `None` if the log is empty.
    async fn latest_position(&self) -> Result<Option<f64>, LogReaderError>;
}
