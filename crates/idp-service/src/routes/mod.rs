use crate::handlers::{self, auth_handler::AppState};
use crate::middleware::http_metrics_middleware;
use crate::observability::metrics::TOKEN_PATH;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Upper bound on any request, above the authenticator reply timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let token_routes = Router::new()
        // OAuth 2.0 client credentials
        .route(TOKEN_PATH, post(handlers::auth_handler::handle_token))
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    token_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
