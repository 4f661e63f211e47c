//! Projection handler, registry, and batch-processing engine.
//!
//! This crate owns the running system: [`handler::ProjectionHandler`]
//! drives a single [`readmodel_core::Projection`] forward batch by batch,
//! and [`registry::Registry`] manages a whole fleet of them behind one
//! set of shared storage backends.

pub mod error;
pub mod handler;
pub mod registry;
pub mod state;

pub use error::{HandlerError, RegistryError};
pub use handler::{HandlerHandles, ProjectionHandler};
pub use registry::{ProjectionHealth, Registry};
pub use state::HandlerState;
