//! Admin HTTP surface for inspecting and operating registered projections.
//!
//! Three read-only endpoints over a shared [`Registry`](readmodel_engine::Registry):
//! list registered projections, read health for all of them, or read health
//! for one by name. Every request carries a correlation ID (generated if
//! the caller didn't supply one) through both logs and the response.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use router::admin_router;
pub use state::AppState;
