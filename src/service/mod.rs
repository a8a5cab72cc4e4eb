//! Instrumented echo HTTP service.

pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::metrics::RequestMetricsRecorder;
use handlers::ServiceState;

/// Build the echo router with the request-metrics middleware attached.
///
/// Every path and method reaches the echo handler; the middleware performs
/// one full set of instrument observations per completed request.
pub fn create_service_router(
    recorder: Arc<RequestMetricsRecorder>,
    service_cfg: &ServiceConfig,
) -> Router {
    let state = ServiceState {
        recorder,
        max_sleep_ms: service_cfg.max_sleep_ms,
    };

    Router::new()
        .route("/", any(handlers::echo))
        .route("/{*path}", any(handlers::echo))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
