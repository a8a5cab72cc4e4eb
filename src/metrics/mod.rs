//! Request-level metrics: explicit registry, fixed instrument set,
//! status-code classification, and the Prometheus exposition listener.

pub mod exporter;
pub mod process;
pub mod recorder;
pub mod registry;
pub mod status;

pub use exporter::{metrics_router, MetricsExporter};
pub use process::spawn_process_collector;
pub use recorder::RequestMetricsRecorder;
pub use registry::{InstrumentKind, MetricDefinition, MetricsRegistry, RegistrySettings};
pub use status::StatusClass;
