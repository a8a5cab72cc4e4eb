//! Prometheus exposition listener.
//!
//! Serves `GET /metrics` on a dedicated port. Binding the listener is part of
//! startup: a bind failure is unrecoverable and aborts the process.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::registry::MetricsRegistry;
use crate::shared::errors::StartupError;
use crate::shared::shutdown::ShutdownSignal;

/// Bound exposition listener, ready to serve.
pub struct MetricsExporter {
    listener: TcpListener,
    router: Router,
}

impl MetricsExporter {
    /// Bind the metrics listener.
    ///
    /// Failure here (port in use, bad address) is a fatal startup error.
    pub async fn bind(addr: &str, registry: Arc<MetricsRegistry>) -> Result<Self, StartupError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::MetricsBind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            router: metrics_router(registry),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve scrapes until shutdown is triggered.
    pub async fn serve(self, shutdown: ShutdownSignal) -> std::io::Result<()> {
        let mut rx = shutdown.subscribe();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                info!("Metrics exporter received shutdown signal");
            })
            .await
    }
}

/// Router serving `GET /metrics` from a registry.
pub fn metrics_router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(registry)
}

/// `GET /metrics` — Prometheus scrape endpoint (no auth)
async fn render_metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        registry.render(),
    )
}
