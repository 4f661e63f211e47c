//! Correlation ID tracking for admin requests.
//!
//! Extracts (or generates) a correlation ID per request, stores it in
//! request extensions, runs the handler inside a tracing span carrying it,
//! and echoes it back in the response header.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation ID on both request and response.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Build the correlation-id tracking layer.
#[must_use]
pub fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Tower layer wrapping a service with correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Service produced by [`CorrelationIdLayer`].
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "admin_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;
            if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn generates_correlation_id_when_absent() {
        let app = Router::new()
            .route("/probe", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let response = app
            .oneshot(HttpRequest::builder().uri("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation id header should be set");
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn preserves_correlation_id_from_request() {
        let app = Router::new()
            .route("/probe", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let id = Uuid::new_v4();
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/probe")
                    .header(CORRELATION_ID_HEADER, id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header = response.headers().get(CORRELATION_ID_HEADER).unwrap();
        assert_eq!(header.to_str().unwrap(), id.to_string());
    }
}
