//! The contract a concrete read model implements.
//!
//! A concrete projection is a plain value with a small interface:
//! `name`, `tables`, `event_types`, `init`, `reduce`. There is no shared
//! mutable base state and no protected helper methods to inherit.

use crate::error::ReduceError;
use crate::event::Event;
use sqlx::{Postgres, Transaction};

/// The transactional handle a reducer applies its effects on.
///
/// The engine opens exactly one transaction per batch and
/// hands it to every `reduce` call in that batch, so a reducer's writes and
/// the engine's own cursor write commit or roll back together.
pub type Tx<'a> = Transaction<'a, Postgres>;

/// A read model that consumes a declared subset of the event log.
///
/// # Determinism and redelivery
///
/// `reduce` must be deterministic given `(event, current table state)` and
/// must tolerate re-delivery of the same event before the cursor advance
/// commits: at-least-once *within* a batch boundary is the contract;
/// exactly-once *after* the cursor commits.
pub trait Projection: Send + Sync {
    /// Stable unique name. Must match the key used to register this
    /// projection with the engine.
    fn name(&self) -> &str;

    /// Tables this projection writes to, used by `reset` to truncate.
    fn tables(&self) -> &[&str];

    /// Event types this projection's reducer understands.
    fn event_types(&self) -> &[&str];

    /// Aggregate types this projection cares about. Empty means "any".
    fn aggregate_types(&self) -> &[&str] {
        &[]
    }

    /// Idempotent setup. Schemas are created by an out-of-scope migrator;
    /// this is usually a no-op. Default: no-op.
    fn init(&self) -> impl std::future::Future<Output = Result<(), ReduceError>> + Send {
        async { Ok(()) }
    }

    /// Apply `event`'s effect inside `tx`.
    ///
    /// # Errors
    /// A concrete projection fails only by returning [`ReduceError`]; the
    /// handler decides whether the failure is recoverable.
    fn reduce(
        &self,
        event: &Event,
        tx: &mut Tx<'_>,
    ) -> impl std::future::Future<Output = Result<(), ReduceError>> + Send;
}
