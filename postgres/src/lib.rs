//! `PostgreSQL` storage backends for the read-model projection engine.
//!
//! This crate implements the storage traits declared in
//! `readmodel-core` against a single `PostgreSQL` database: the
//! event log reader, the durable cursor tracker, the failed-event
//! ledger, and the distributed lease lock. It uses sqlx for
//! compile-time checked queries and connection pooling.
//!
//! # Example
//!
//! ```ignore
//! use readmodel_postgres::PostgresEventLogReader;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/mydb").await?;
//!     let reader = PostgresEventLogReader::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod event_log;
mod failed_event;
mod lock;
mod state_tracker;

pub use event_log::PostgresEventLogReader;
pub use failed_event::PostgresFailedEventLedger;
pub use lock::PostgresProjectionLockStore;
pub use state_tracker::PostgresCurrentStateTracker;

/// Runs the crate's embedded migrations against the given pool.
///
/// # Errors
/// Returns an error if any migration fails to apply.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
