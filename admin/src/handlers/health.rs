//! Admin endpoints for inspecting registered projections.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use readmodel_engine::ProjectionHealth;
use serde::{Deserialize, Serialize};

/// One entry in the `list` endpoint's response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionSummary {
    name: String,
    is_running: bool,
}

/// Response body for `GET /api/v1/admin/projections/list`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    total: usize,
    projections: Vec<ProjectionSummary>,
}

/// `GET /api/v1/admin/projections/list` — every registered projection and
/// whether it is currently running.
pub async fn list_projections(State(state): State<AppState>) -> Json<ListResponse> {
    let names = state.registry.names().await;
    let mut projections = Vec::with_capacity(names.len());
    for name in names {
        let is_running = state.registry.is_running(&name).await;
        projections.push(ProjectionSummary { name, is_running });
    }
    Json(ListResponse {
        total: projections.len(),
        projections,
    })
}

/// Response body for `GET /api/v1/admin/projections/health`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    total_projections: usize,
    healthy_projections: usize,
    unhealthy_projections: usize,
    average_lag: f64,
    max_lag: f64,
    projections: Vec<ProjectionHealth>,
    timestamp: DateTime<Utc>,
}

/// `GET /api/v1/admin/projections/health` — aggregate health of every
/// registered projection.
///
/// # Errors
/// Returns an error if the cursor, log head, or quarantine ledger can't be
/// read for any registered projection.
pub async fn health_all(State(state): State<AppState>) -> Result<Json<HealthSummary>, AppError> {
    let projections = state.registry.health_all().await?;

    let total_projections = projections.len();
    let healthy_projections = projections.iter().filter(|p| p.is_healthy).count();
    let unhealthy_projections = total_projections - healthy_projections;
    let average_lag = if total_projections == 0 {
        0.0
    } else {
        projections.iter().map(|p| p.lag).sum::<f64>() / total_projections as f64
    };
    let max_lag = projections
        .iter()
        .map(|p| p.lag)
        .fold(0.0_f64, f64::max);

    Ok(Json(HealthSummary {
        total_projections,
        healthy_projections,
        unhealthy_projections,
        average_lag,
        max_lag,
        projections,
        timestamp: Utc::now(),
    }))
}

/// `GET /api/v1/admin/projections/health/{name}` — full health snapshot of
/// one registered projection.
///
/// # Errors
/// Returns 404 if `name` is not currently registered.
pub async fn health_one(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProjectionHealth>, AppError> {
    Ok(Json(state.registry.health(&name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::admin_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use readmodel_core::config::ProjectionConfig;
    use readmodel_core::error::ReduceError;
    use readmodel_core::event::Event;
    use readmodel_core::projection::Tx;
    use readmodel_core::Projection;
    use readmodel_engine::Registry;
    use readmodel_testing::{FakeEventLog, FakeFailedEventLedger, FakeStateTracker};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct NoopProjection;

    impl Projection for NoopProjection {
        fn name(&self) -> &str {
            "noop"
        }

        fn tables(&self) -> &[&str] {
            &[]
        }

        fn event_types(&self) -> &[&str] {
            &[]
        }

        async fn reduce(&self, _event: &Event, _tx: &mut Tx<'_>) -> Result<(), ReduceError> {
            Ok(())
        }
    }

    fn test_registry() -> Arc<Registry> {
        Arc::new(Registry::new(
            sqlx::PgPool::connect_lazy("postgres://localhost/nonexistent")
                .expect("lazy pool should construct without connecting"),
            Arc::new(FakeEventLog::new(vec![])),
            Arc::new(FakeStateTracker::new()),
            Arc::new(FakeFailedEventLedger::new()),
            None,
            Uuid::new_v4(),
        ))
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    async fn list_is_empty_before_registration() {
        let registry = test_registry();
        let app = admin_router(AppState::new(registry));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/projections/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.total, 0);
        assert!(parsed.projections.is_empty());
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    async fn health_for_unregistered_projection_is_404() {
        let registry = test_registry();
        let app = admin_router(AppState::new(registry));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/projections/health/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    async fn registered_projection_appears_in_list_and_health() {
        let registry = test_registry();
        registry
            .register(NoopProjection, ProjectionConfig::new("noop").without_locking())
            .await
            .expect("registration should succeed");

        let app = admin_router(AppState::new(registry.clone()));
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/projections/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.total, 1);
        assert!(parsed.projections[0].is_running);
        assert_eq!(parsed.projections[0].name, "noop");

        let health_response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/projections/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(health_response.status(), StatusCode::OK);
        let health_body = axum::body::to_bytes(health_response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthSummary = serde_json::from_slice(&health_body).unwrap();
        assert_eq!(health.total_projections, 1);
        assert_eq!(health.healthy_projections, 1);
        assert_eq!(health.unhealthy_projections, 0);

        registry.stop_all().await;
    }
}
