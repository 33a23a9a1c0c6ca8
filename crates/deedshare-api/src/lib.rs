//! # deedshare-api — Axum API Service for Fractional Property Ownership
//!
//! Users register and deposit tokens, create tokenized properties and
//! transfer fractional shares between holders. A property's owner is always
//! its majority shareholder.
//!
//! ## API Surface
//!
//! | Route                        | Module                   |
//! |------------------------------|--------------------------|
//! | `/users`, `/users/*`         | [`routes::users`]        |
//! | `/properties`, `/properties/:id` | [`routes::properties`] |
//! | `/transfer/:id`              | [`routes::transfers`]    |
//! | `/health/*`, `/metrics`, `/openapi.json` | operational, unauthenticated |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, metrics and the OpenAPI document are mounted outside the
/// auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::users::router())
        .merge(routes::properties::router())
        .merge(routes::transfers::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics.clone()));

    // Unauthenticated operational routes.
    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::metrics_handler))
        .merge(openapi::router())
        .layer(axum::Extension(metrics));

    Router::new().merge(ops).merge(api).with_state(state)
}

/// Liveness probe. Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 200 when both tables can be read right now; never waits
/// on a held lock.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let ready = state.users.is_available() && state.properties.is_available();
    if ready {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("readiness probe: store lock unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
