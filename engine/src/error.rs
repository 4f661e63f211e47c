//! Errors surfaced by the handler and registry.

use readmodel_core::error::{
    FailedEventLedgerError, LockError, LogReaderError, ReduceError, StateTrackerError,
};
use thiserror::Error;

/// Errors a running `ProjectionHandler` can produce.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Failed to read from the event log.
    #[error(transparent)]
    LogReader(#[from] LogReaderError),
    /// Failed to read or write the durable cursor.
    #[error(transparent)]
    StateTracker(#[from] StateTrackerError),
    /// Failed to read or write the quarantine ledger.
    #[error(transparent)]
    FailedEventLedger(#[from] FailedEventLedgerError),
    /// Failed to acquire, renew, or release the distributed lease.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// The underlying database connection failed outside of a reducer call.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A reducer call failed with a transient (non-poison) error; the batch
    /// was aborted without committing and will be retried.
    #[error("transient reducer failure, batch aborted: {0}")]
    Transient(ReduceError),
}

/// Errors from registering or controlling a projection via the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A projection with this name is already registered.
    #[error("projection {0} is already registered")]
    AlreadyRegistered(String),
    /// No projection with this name has been registered.
    #[error("projection {0} is not registered")]
    NotRegistered(String),
    /// The requested action isn't valid from the projection's current state.
    #[error("projection {name} is {state}, cannot {action}")]
    InvalidTransition {
        /// The projection this request targeted.
        name: String,
        /// Its current lifecycle state.
        state: String,
        /// The action that was rejected.
        action: String,
    },
    /// The underlying distributed lock store failed.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// Failed to read the event log while computing health or lag.
    #[error(transparent)]
    LogReader(#[from] LogReaderError),
    /// Failed to read or write the durable cursor during a lifecycle
    /// operation (health snapshot, reset).
    #[error(transparent)]
    StateTracker(#[from] StateTrackerError),
    /// Failed to read or write the quarantine ledger during a lifecycle
    /// operation (health snapshot, reset).
    #[error(transparent)]
    FailedEventLedger(#[from] FailedEventLedgerError),
    /// The underlying database failed while truncating tables on reset.
    #[error("database error during reset: {0}")]
    Database(#[from] sqlx::Error),
}
