//! # Request Metrics
//!
//! Lightweight request metrics using atomic counters, exposed as JSON at
//! `/metrics` together with the table sizes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Shared metrics state.
#[derive(Debug, Clone)]
pub struct ApiMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return current request count.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Return current error count.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if response.status().is_server_error() || response.status().is_client_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}

/// Counters reported by `/metrics`.
#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    /// Business requests served.
    pub requests: u64,
    /// Business requests answered with a 4xx or 5xx status.
    pub errors: u64,
    /// Registered users.
    pub users: usize,
    /// Stored properties.
    pub properties: usize,
}

/// GET /metrics — Request counters and table sizes.
pub async fn metrics_handler(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Json<MetricsSnapshot> {
    Json(MetricsSnapshot {
        requests: metrics.requests(),
        errors: metrics.errors(),
        users: state.users.len(),
        properties: state.properties.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn counted_app(metrics: ApiMetrics) -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/bad", get(|| async { StatusCode::BAD_REQUEST }))
            .layer(from_fn(metrics_middleware))
            .layer(axum::Extension(metrics))
    }

    #[tokio::test]
    async fn counts_requests_and_errors() {
        let metrics = ApiMetrics::new();
        let app = counted_app(metrics.clone());

        for uri in ["/ok", "/ok", "/bad"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let _ = response.status();
        }

        assert_eq!(metrics.requests(), 3);
        assert_eq!(metrics.errors(), 1);
    }

    #[test]
    fn new_metrics_start_at_zero() {
        let metrics = ApiMetrics::default();
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.errors(), 0);
    }
}
