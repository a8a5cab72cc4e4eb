//! # Echo Metrics Service
//!
//! Instrumented HTTP echo server exposing request-level metrics to a
//! Prometheus-compatible scraper on a dedicated port.
//!
//! ## Architecture
//!
//! - **config**: TOML configuration and the derived effective listen ports
//! - **metrics**: explicit metrics registry, the fixed request-instrument
//!   set, status-code classification, and the exposition listener
//! - **service**: the echo router and the per-request metrics middleware
//! - **shared**: error taxonomy and graceful shutdown signalling

pub mod config;
pub mod metrics;
pub mod service;
pub mod shared;

pub use config::{default_config_path, AppConfig, EffectiveConfig};
pub use metrics::{MetricsExporter, MetricsRegistry, RequestMetricsRecorder, StatusClass};
pub use service::create_service_router;
pub use shared::errors::{ConfigError, MetricsError, StartupError};
