//! HTTP handlers for the admin surface.

pub mod health;

pub use health::{health_all, health_one, list_projections};
