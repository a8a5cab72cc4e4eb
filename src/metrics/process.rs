//! Process-level runtime metrics.
//!
//! Publishes the standard process gauges (resident/virtual memory, CPU
//! seconds, open fds, start time) through the `metrics` facade. The collector
//! records via the global recorder, so the registry must be installed with
//! [`crate::metrics::MetricsRegistry::install_global`] first.

use std::time::Duration;

use metrics_process::Collector;
use tracing::debug;

use crate::shared::shutdown::ShutdownSignal;

const COLLECT_INTERVAL: Duration = Duration::from_secs(5);

/// Start the periodic process-metrics collector.
pub fn spawn_process_collector(shutdown: ShutdownSignal) {
    let collector = Collector::default();
    collector.describe();

    tokio::spawn(async move {
        let mut tick = tokio::time::interval(COLLECT_INTERVAL);
        let mut rx = shutdown.subscribe();
        loop {
            tokio::select! {
                _ = tick.tick() => collector.collect(),
                _ = rx.recv() => break,
            }
        }
        debug!("Process metrics collector stopped");
    });
}
