//! In-memory fakes and test helpers for the projection engine.
//!
//! [`fakes`] provides lock-backed implementations of the four storage
//! traits so handler and registry tests run fast and deterministic,
//! without a database. [`builders`] has small helpers for constructing
//! sample events.

pub mod builders;
pub mod fakes;

pub use fakes::{FakeEventLog, FakeFailedEventLedger, FakeLockStore, FakeStateTracker};
