//! Router assembly for the admin HTTP surface.

use crate::handlers::{health_all, health_one, list_projections};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the admin router: `GET /api/v1/admin/projections/list`,
/// `GET /api/v1/admin/projections/health`, and
/// `GET /api/v1/admin/projections/health/{name}`.
#[must_use]
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/admin/projections/list", get(list_projections))
        .route("/api/v1/admin/projections/health", get(health_all))
        .route("/api/v1/admin/projections/health/:name", get(health_one))
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
