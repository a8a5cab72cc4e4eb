//! Cross-cutting support: error taxonomy and shutdown coordination.

pub mod errors;
pub mod shutdown;

pub use errors::{ConfigError, MetricsError, StartupError};
pub use shutdown::{listen_for_shutdown_signals, ShutdownSignal};
