//! The handler lifecycle state machine.
//!
//! `STOPPED -> STARTING -> CATCH_UP <-> LIVE -> STOPPING -> STOPPED`, with a
//! terminal `ERROR` reachable from any running state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A projection handler's lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum HandlerState {
    /// Not running; no resources held.
    Stopped,
    /// Acquiring the lease (if locking is enabled) and running `init`.
    Starting,
    /// Fetching full batches back-to-back; not yet within one batch of the
    /// log's head.
    CatchUp,
    /// The last batch returned fewer events than `batch_size`; waiting on
    /// the wake signal or the tick interval.
    Live,
    /// Releasing the lease and returning to `Stopped`.
    Stopping,
    /// A non-recoverable failure occurred; the handler will not restart
    /// itself. Carries a human-readable cause.
    Error(String),
}

impl HandlerState {
    /// `true` for `CatchUp` or `Live` — the handler is actively making (or
    /// trying to make) progress.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::CatchUp | Self::Live)
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::CatchUp => write!(f, "catch_up"),
            Self::Live => write!(f, "live"),
            Self::Stopping => write!(f, "stopping"),
            Self::Error(cause) => write!(f, "error: {cause}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_catch_up_and_live_are_running() {
        assert!(HandlerState::CatchUp.is_running());
        assert!(HandlerState::Live.is_running());
        assert!(!HandlerState::Stopped.is_running());
        assert!(!HandlerState::Starting.is_running());
        assert!(!HandlerState::Error("boom".to_string()).is_running());
    }
}
