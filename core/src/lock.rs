//! Distributed lease lock protocol.

use crate::error::LockError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// A lease row: at most one per `projection_name`, held iff `expires_at >
/// now()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionLock {
    /// The projection this lease is for.
    pub projection_name: String,
    /// The worker instance currently holding (or last holding) the lease.
    pub holder_id: Uuid,
    /// When the lease was (most recently) acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lease expires, absent renewal.
    pub expires_at: DateTime<Utc>,
}

/// Leased mutual exclusion over a projection name.
///
/// Acquisition is an upsert that only overwrites a stale (expired) lease;
/// renewal is a conditional update; release is a conditional delete.
#[async_trait]
pub trait ProjectionLockStore: Send + Sync {
    /// Attempt to acquire (or reclaim a stale) lease for `projection_name`.
    /// Returns `true` iff `holder_id` now holds it.
    async fn try_acquire(
        &self,
        projection_name: &str,
        holder_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError>;

    /// Extend the lease, conditional on `holder_id` still being the holder.
    /// Returns `true` iff the renewal took effect.
    async fn renew(
        &self,
        projection_name: &str,
        holder_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError>;

    /// Release the lease, conditional on `holder_id` still being the holder.
    /// A no-op (not an error) if the lease was already gone or held by
    /// someone else.
    async fn release(&self, projection_name: &str, holder_id: Uuid) -> Result<(), LockError>;

    /// Read the current lease for `projection_name`, if any (including
    /// expired ones, for diagnostics).
    async fn get(&self, projection_name: &str) -> Result<Option<ProjectionLock>, LockError>;

    /// Delete all expired lease rows. Returns the number removed.
    async fn cleanup_expired(&self) -> Result<u64, LockError>;
}
