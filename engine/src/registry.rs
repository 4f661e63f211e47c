//! Lifecycle management for a set of registered projections.

use crate::error::RegistryError;
use crate::handler::{HandlerHandles, ProjectionHandler};
use crate::state::HandlerState;
use chrono::{DateTime, Utc};
use readmodel_core::config::ProjectionConfig;
use readmodel_core::failed_event::FailedEventLedger;
use readmodel_core::lock::ProjectionLockStore;
use readmodel_core::log_reader::EventLogReader;
use readmodel_core::projection::Projection;
use readmodel_core::state_tracker::CurrentStateTracker;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// A projection is considered healthy if its time-based lag is within this
/// many milliseconds (or it has never run at all).
const HEALTHY_LAG_MS: i64 = 5000;

/// Point-in-time health summary for one registered projection.
///
/// Field names are camelCase on the wire (matching the admin HTTP API)
/// even though the Rust identifiers stay snake_case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionHealth {
    /// The projection's registered name.
    pub name: String,
    /// Its current lifecycle state.
    pub state: HandlerState,
    /// Short status label derived from `state`: `"stopped"`, `"starting"`,
    /// `"running"` (covers both `CatchUp` and `Live`), `"stopping"`, or
    /// `"error"`.
    #[serde(skip_deserializing)]
    pub status: &'static str,
    /// Current cursor position, or `0.0` if the projection has never run.
    pub position: f64,
    /// `latest_position - position`, in event-log position units, via
    /// [`CurrentStateTracker::lag`].
    pub lag: f64,
    /// Milliseconds since the cursor was last advanced. `0` if it has
    /// never advanced.
    pub lag_ms: i64,
    /// Wall-clock time of the last cursor write, if any.
    pub last_processed_at: Option<DateTime<Utc>>,
    /// `true` if the projection has never run (`position == 0.0`) or its
    /// time-based lag is within [`HEALTHY_LAG_MS`].
    pub is_healthy: bool,
    /// Number of quarantined (failed-event) entries for this projection.
    pub error_count: u64,
    /// The most recent quarantine error message, if any.
    pub last_error: Option<String>,
}

fn status_label(state: &HandlerState) -> &'static str {
    match state {
        HandlerState::Stopped => "stopped",
        HandlerState::Starting => "starting",
        HandlerState::CatchUp | HandlerState::Live => "running",
        HandlerState::Stopping => "stopping",
        HandlerState::Error(_) => "error",
    }
}

/// Boxed constructor captured at registration time: builds and spawns a
/// fresh handler for the projection this entry was registered with,
/// reusing the registry's shared storage backends.
type Respawn = Box<dyn Fn() -> (HandlerHandles, JoinHandle<()>) + Send + Sync>;

struct RunningHandler {
    handles: HandlerHandles,
    task: JoinHandle<()>,
}

struct RegisteredProjection {
    config: ProjectionConfig,
    respawn: Respawn,
    running: Option<RunningHandler>,
}

/// Owns every registered projection's handles and join task, and exposes
/// start/stop/reset/health operations across the whole set.
///
/// Shared storage backends (log reader, cursor tracker, ledger, lock
/// store) are injected once and reused by every handler the registry
/// spawns.
pub struct Registry {
    pool: PgPool,
    log_reader: Arc<dyn EventLogReader>,
    state_tracker: Arc<dyn CurrentStateTracker>,
    failed_ledger: Arc<dyn FailedEventLedger>,
    lock_store: Option<Arc<dyn ProjectionLockStore>>,
    holder_id: Uuid,
    projections: Mutex<HashMap<String, RegisteredProjection>>,
}

impl Registry {
    /// Build a registry sharing the given storage backends across every
    /// projection it runs. `holder_id` identifies this process as a lease
    /// holder when locking is enabled.
    #[must_use]
    pub fn new(
        pool: PgPool,
        log_reader: Arc<dyn EventLogReader>,
        state_tracker: Arc<dyn CurrentStateTracker>,
        failed_ledger: Arc<dyn FailedEventLedger>,
        lock_store: Option<Arc<dyn ProjectionLockStore>>,
        holder_id: Uuid,
    ) -> Self {
        Self {
            pool,
            log_reader,
            state_tracker,
            failed_ledger,
            lock_store,
            holder_id,
            projections: Mutex::new(HashMap::new()),
        }
    }

    /// Register and start `projection` under `config.name`. The handler
    /// begins running immediately on a spawned task.
    ///
    /// # Errors
    /// Returns [`RegistryError::AlreadyRegistered`] if a projection with
    /// this name is already registered.
    pub async fn register<P: Projection + 'static>(
        &self,
        projection: P,
        config: ProjectionConfig,
    ) -> Result<(), RegistryError> {
        let mut projections = self.projections.lock().await;
        if projections.contains_key(&config.name) {
            return Err(RegistryError::AlreadyRegistered(config.name));
        }

        let respawn = self.build_respawn(Arc::new(projection), config.clone());
        let (handles, task) = respawn();

        projections.insert(
            config.name.clone(),
            RegisteredProjection {
                config,
                respawn,
                running: Some(RunningHandler { handles, task }),
            },
        );
        Ok(())
    }

    /// Build the closure that (re)spawns a handler for `projection` under
    /// `config`, capturing clones of the registry's shared backends so it
    /// can be called again later by `start`/`reset` without needing the
    /// original typed projection value.
    fn build_respawn<P: Projection + 'static>(
        &self,
        projection: Arc<P>,
        config: ProjectionConfig,
    ) -> Respawn {
        let pool = self.pool.clone();
        let log_reader = self.log_reader.clone();
        let state_tracker = self.state_tracker.clone();
        let failed_ledger = self.failed_ledger.clone();
        let lock_store = self.lock_store.clone();
        let holder_id = self.holder_id;

        Box::new(move || {
            let (handler, handles) = ProjectionHandler::new(
                projection.clone(),
                config.clone(),
                pool.clone(),
                log_reader.clone(),
                state_tracker.clone(),
                failed_ledger.clone(),
                if config.enable_locking {
                    lock_store.clone()
                } else {
                    None
                },
                holder_id,
            );
            let name = config.name.clone();
            let task = tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    tracing::error!(projection = %name, error = %err, "handler task exited with error");
                }
            });
            (handles, task)
        })
    }

    /// Signal `name`'s handler to stop (if running), wait for its task to
    /// finish, and remove it from the registry entirely.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotRegistered`] if `name` isn't registered.
    pub async fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        let entry = {
            let mut projections = self.projections.lock().await;
            projections
                .remove(name)
                .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?
        };
        if let Some(running) = entry.running {
            running.handles.shutdown_tx.send_replace(true);
            let _ = running.task.await;
        }
        Ok(())
    }

    /// Start `name`'s handler. It must currently be registered and
    /// stopped.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotRegistered`] if `name` isn't registered,
    /// or [`RegistryError::InvalidTransition`] if it is already running.
    pub async fn start(&self, name: &str) -> Result<(), RegistryError> {
        let mut projections = self.projections.lock().await;
        let entry = projections
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        if entry.running.is_some() {
            return Err(RegistryError::InvalidTransition {
                name: name.to_string(),
                state: "running".to_string(),
                action: "start".to_string(),
            });
        }
        let (handles, task) = (entry.respawn)();
        entry.running = Some(RunningHandler { handles, task });
        Ok(())
    }

    /// Stop `name`'s handler, leaving it registered so it can be
    /// restarted with [`Self::start`].
    ///
    /// # Errors
    /// Returns [`RegistryError::NotRegistered`] if `name` isn't registered,
    /// or [`RegistryError::InvalidTransition`] if it is already stopped.
    pub async fn stop(&self, name: &str) -> Result<(), RegistryError> {
        let running = {
            let mut projections = self.projections.lock().await;
            let entry = projections
                .get_mut(name)
                .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
            entry
                .running
                .take()
                .ok_or_else(|| RegistryError::InvalidTransition {
                    name: name.to_string(),
                    state: "stopped".to_string(),
                    action: "stop".to_string(),
                })?
        };
        running.handles.shutdown_tx.send_replace(true);
        let _ = running.task.await;
        Ok(())
    }

    /// Start every currently-stopped registered projection. Failures for
    /// individual projections are logged, not propagated, so one stuck
    /// projection doesn't block the rest of the fleet from starting.
    pub async fn start_all(&self) {
        let names: Vec<String> = {
            let projections = self.projections.lock().await;
            projections
                .iter()
                .filter(|(_, entry)| entry.running.is_none())
                .map(|(name, _)| name.clone())
                .collect()
        };
        for name in names {
            if let Err(err) = self.start(&name).await {
                tracing::warn!(projection = %name, error = %err, "failed to start projection");
            }
        }
    }

    /// Stop every currently-running registered projection, leaving all of
    /// them registered.
    pub async fn stop_all(&self) {
        let names: Vec<String> = {
            let projections = self.projections.lock().await;
            projections
                .iter()
                .filter(|(_, entry)| entry.running.is_some())
                .map(|(name, _)| name.clone())
                .collect()
        };
        for name in names {
            if let Err(err) = self.stop(&name).await {
                tracing::warn!(projection = %name, error = %err, "failed to stop projection");
            }
        }
    }

    /// Rebuild `name`: stop it if running, truncate its target tables,
    /// delete its cursor and quarantine entries, then start it again from
    /// the origin.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotRegistered`] if `name` isn't registered,
    /// or any storage error encountered while truncating or restarting.
    pub async fn reset(&self, name: &str) -> Result<(), RegistryError> {
        let tables = {
            let projections = self.projections.lock().await;
            projections
                .get(name)
                .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?
                .config
                .tables
                .clone()
        };

        match self.stop(name).await {
            Ok(()) | Err(RegistryError::InvalidTransition { .. }) => {}
            Err(err) => return Err(err),
        }

        for table in tables {
            sqlx::query(&format!("TRUNCATE TABLE {table}"))
                .execute(&self.pool)
                .await?;
        }
        self.state_tracker.delete(name).await?;
        self.failed_ledger.clear(name).await?;

        self.start(name).await
    }

    /// Nudge `name`'s handler to check for work immediately instead of
    /// waiting for its next tick.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotRegistered`] if `name` isn't registered,
    /// or [`RegistryError::InvalidTransition`] if it isn't currently
    /// running.
    pub async fn wake(&self, name: &str) -> Result<(), RegistryError> {
        let projections = self.projections.lock().await;
        let entry = projections
            .get(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        let running = entry
            .running
            .as_ref()
            .ok_or_else(|| RegistryError::InvalidTransition {
                name: name.to_string(),
                state: "stopped".to_string(),
                action: "wake".to_string(),
            })?;
        running.handles.wake_tx.send_replace(());
        Ok(())
    }

    /// Full health snapshot for `name`: lifecycle state, cursor position,
    /// lag against the log head, and quarantine counts.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotRegistered`] if `name` isn't registered,
    /// or a storage error if the cursor, log head, or ledger can't be read.
    pub async fn health(&self, name: &str) -> Result<ProjectionHealth, RegistryError> {
        let state = {
            let projections = self.projections.lock().await;
            let entry = projections
                .get(name)
                .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
            entry
                .running
                .as_ref()
                .map_or(HandlerState::Stopped, |running| {
                    running.handles.state_rx.borrow().clone()
                })
        };
        self.build_health(name, state).await
    }

    async fn build_health(
        &self,
        name: &str,
        state: HandlerState,
    ) -> Result<ProjectionHealth, RegistryError> {
        let cursor_state = self.state_tracker.get(name).await?;
        let position = cursor_state
            .as_ref()
            .map_or(0.0, |state| state.position.position.0);
        let last_processed_at = cursor_state.as_ref().map(|state| state.updated_at);

        let latest_position = self.log_reader.latest_position().await?.unwrap_or(position);
        let lag = self.state_tracker.lag(name, latest_position).await?;
        let lag_ms = last_processed_at.map_or(0, |last| (Utc::now() - last).num_milliseconds().max(0));
        let is_healthy = position == 0.0 || lag_ms <= HEALTHY_LAG_MS;

        let failed = self.failed_ledger.list(name).await?;
        let error_count = failed.len() as u64;
        let last_error = failed
            .iter()
            .max_by_key(|entry| entry.last_failed_at)
            .map(|entry| entry.last_error.clone());

        Ok(ProjectionHealth {
            name: name.to_string(),
            status: status_label(&state),
            state,
            position,
            lag,
            lag_ms,
            last_processed_at,
            is_healthy,
            error_count,
            last_error,
        })
    }

    /// Health snapshot for every registered projection.
    ///
    /// # Errors
    /// Returns a storage error if the cursor, log head, or ledger can't be
    /// read for any registered projection.
    pub async fn health_all(&self) -> Result<Vec<ProjectionHealth>, RegistryError> {
        let names = self.names().await;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            out.push(self.health(&name).await?);
        }
        Ok(out)
    }

    /// Names of every currently registered projection.
    pub async fn names(&self) -> Vec<String> {
        self.projections.lock().await.keys().cloned().collect()
    }

    /// `true` if `name` is registered and currently running.
    pub async fn is_running(&self, name: &str) -> bool {
        self.projections
            .lock()
            .await
            .get(name)
            .is_some_and(|entry| entry.running.is_some())
    }

    /// Remove stale lease rows across all projections (not just ones this
    /// process has registered); safe to call from any instance.
    ///
    /// # Errors
    /// Returns an error if the underlying lock store read/write fails, or
    /// if no lock store was configured for this registry.
    pub async fn cleanup_expired_locks(&self) -> Result<u64, RegistryError> {
        match &self.lock_store {
            Some(lock_store) => Ok(lock_store.cleanup_expired().await?),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_label_collapses_catch_up_and_live_to_running() {
        assert_eq!(status_label(&HandlerState::CatchUp), "running");
        assert_eq!(status_label(&HandlerState::Live), "running");
        assert_eq!(status_label(&HandlerState::Stopped), "stopped");
        assert_eq!(
            status_label(&HandlerState::Error("boom".to_string())),
            "error"
        );
    }
}
