//! # Read-model projection engine — core
//!
//! Core traits and types shared by every crate in this workspace: the
//! event shape crossing the log boundary, cursor comparison, the four
//! storage contracts (log reader, current-state tracker, failed-event
//! ledger, distributed lock), and the `Projection` contract a concrete
//! read model implements.

pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod failed_event;
pub mod lock;
pub mod log_reader;
pub mod projection;
pub mod state_tracker;

pub use config::ProjectionConfig;
pub use cursor::Cursor;
pub use error::{FailedEventLedgerError, LockError, LogReaderError, ReduceError, StateTrackerError};
pub use event::{Event, EventFilter};
pub use failed_event::{FailedEvent, FailedEventLedger, FailedEventStats};
pub use lock::{ProjectionLock, ProjectionLockStore};
pub use log_reader::EventLogReader;
pub use projection::{Projection, Tx};
pub use state_tracker::{CurrentStateTracker, CursorAdvance, ProjectionState};
