//! Application state shared across admin HTTP handlers.

use readmodel_engine::Registry;
use std::sync::Arc;

/// Shared state for the admin router: a handle to the running [`Registry`].
#[derive(Clone)]
pub struct AppState {
    /// The registry this admin surface inspects and controls.
    pub registry: Arc<Registry>,
}

impl AppState {
    /// Wrap a registry for use as Axum router state.
    #[must_use]
    pub const fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}
