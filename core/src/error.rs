//! Error taxonomy for the projection engine.

use thiserror::Error;

/// Errors from the event log reader.
#[derive(Debug, Error)]
pub enum LogReaderError {
    /// The underlying query against the `events` table failed.
    #[error("event log query failed: {0}")]
    Storage(String),
}

/// Errors from the current-state tracker.
#[derive(Debug, Error)]
pub enum StateTrackerError {
    /// The underlying read/write against `projection_states` failed.
    #[error("projection state storage error: {0}")]
    Storage(String),
    /// `wait_for_position` did not observe the target cursor within the
    /// caller-supplied timeout. Treat this as
    /// "read-your-own-writes not guaranteed", not as a health signal.
    #[error("timed out waiting for projection {projection} to reach position {target}")]
    Timeout {
        /// The projection that did not catch up in time.
        projection: String,
        /// The cursor the caller was waiting for.
        target: String,
    },
}

/// Errors from the failed-event ledger.
#[derive(Debug, Error)]
pub enum FailedEventLedgerError {
    /// The underlying read/write against `projection_failed_events` failed.
    #[error("failed-event ledger storage error: {0}")]
    Storage(String),
}

/// Errors from the distributed lease lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The underlying read/write against `projection_locks` failed.
    #[error("projection lock storage error: {0}")]
    Storage(String),
    /// This worker does not (or no longer) holds the lease it tried to act on.
    #[error("lock for projection {0} is not held by this worker")]
    NotHeld(String),
}

/// Error returned by a concrete projection's `reduce`.
///
/// A reducer fails only by returning one of these; the handler decides
/// whether the failure is recoverable (quarantine) or structural (bug in
/// the reducer, still quarantined but logged louder).
#[derive(Debug, Error)]
pub enum ReduceError {
    /// The reducer's own storage write failed.
    #[error("reducer storage error: {0}")]
    Storage(String),
    /// The event payload did not match the shape this reducer expects.
    #[error("failed to parse event payload: {0}")]
    InvalidPayload(String),
    /// Any other reducer-specific failure.
    #[error("{0}")]
    Other(String),
}
