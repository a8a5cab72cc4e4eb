//!
//! Instrumented HTTP echo server with a dedicated Prometheus metrics listener.
//! Reads configuration from TOML file (~/.config/echo-metrics/config.toml).

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use echo_metrics::config::EffectiveConfig;
use echo_metrics::metrics::{spawn_process_collector, MetricsExporter, MetricsRegistry};
use echo_metrics::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
use echo_metrics::{create_service_router, default_config_path, AppConfig, RequestMetricsRecorder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("ECHO_METRICS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Initialize logging with configured level
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting echo metrics service...");

    // ── Effective listen addresses (base ports + fixed offset) ─
    let effective = EffectiveConfig::derive(&app_cfg);

    // ── Metrics registry and request instruments ───────────────
    let registry = Arc::new(MetricsRegistry::new(
        RequestMetricsRecorder::registry_settings(),
    )?);
    let recorder = Arc::new(RequestMetricsRecorder::register(&registry)?);
    info!("Request instruments registered");

    // The facade drain is only needed by the process collector; the request
    // path records through instrument handles.
    registry.install_global()?;

    // ── Shutdown signal (SIGTERM, SIGINT) ──────────────────────
    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    spawn_process_collector(shutdown.clone());

    // ── Metrics exposition listener ────────────────────────────
    // A bind failure here aborts startup; there is no partial-start mode.
    let exporter = MetricsExporter::bind(&effective.metrics_addr(), registry.clone()).await?;
    info!(
        "Metrics exposition listening on http://{}/metrics",
        exporter.local_addr()?
    );

    // ── Echo service listener ──────────────────────────────────
    let service_router = create_service_router(recorder, &app_cfg.service);
    let service_addr = effective.service_addr();
    let listener = tokio::net::TcpListener::bind(&service_addr)
        .await
        .map_err(|source| echo_metrics::StartupError::ServiceBind {
            addr: service_addr.clone(),
            source,
        })?;
    info!("Echo service listening on http://{}", service_addr);

    let mut service_rx = shutdown.subscribe();
    let service_server = axum::serve(listener, service_router).with_graceful_shutdown(async move {
        let _ = service_rx.recv().await;
        info!("Echo service received shutdown signal");
    });

    info!("All listeners started. Press Ctrl+C to shutdown gracefully.");

    let mut service_task = tokio::spawn(async move { service_server.await });
    let mut metrics_task = tokio::spawn(exporter.serve(shutdown.clone()));

    enum Finished {
        Service,
        Metrics,
    }

    // Wait for shutdown signal or the first listener failure
    let finished = tokio::select! {
        result = &mut service_task => {
            report("Echo service", result);
            Finished::Service
        }
        result = &mut metrics_task => {
            report("Metrics exporter", result);
            Finished::Metrics
        }
    };

    // Stop the remaining listener and give it time to drain
    shutdown.trigger();
    let remaining = match finished {
        Finished::Service => &mut metrics_task,
        Finished::Metrics => &mut service_task,
    };
    let drain = Duration::from_secs(app_cfg.server.shutdown_timeout);
    match tokio::time::timeout(drain, remaining).await {
        Ok(result) => report("Remaining listener", result),
        Err(_) => warn!(
            "Graceful shutdown timed out after {}s",
            app_cfg.server.shutdown_timeout
        ),
    }

    info!("Echo metrics service shutdown complete");
    Ok(())
}

fn report(name: &str, result: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!("{} stopped", name),
        Ok(Err(e)) => error!("{} error: {}", name, e),
        Err(e) => error!("{} task panicked: {}", name, e),
    }
}
