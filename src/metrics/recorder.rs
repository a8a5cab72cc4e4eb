//! Request-level instrument set and status-code counting.
//!
//! [`RequestMetricsRecorder`] registers the fixed set of request instruments
//! against a [`MetricsRegistry`] exactly once and hands out live instrument
//! handles to the request-handling layer. It keeps no mutable state of its
//! own; every update goes straight to the registry's recorder.

use std::sync::Arc;

use metrics::{Counter, Gauge, Histogram};

use super::registry::{InstrumentKind, MetricDefinition, MetricsRegistry, RegistrySettings};
use super::status::StatusClass;
use crate::shared::errors::MetricsError;

pub const REQUESTS_TOTAL: &str = "requests_total";
pub const INPROGRESS_REQUESTS: &str = "inprogress_requests";
pub const REQUESTS_LATENCY_SECONDS: &str = "requests_latency_seconds";
pub const REQUESTS_LATENCY: &str = "requests_latency";
pub const SLEEP_TIME: &str = "sleep_time";
pub const REQUEST_SIZE: &str = "request_size";
pub const RESPONSE_SIZE: &str = "response_size";

/// Quantiles reported by the summary instruments.
pub const SUMMARY_QUANTILES: [f64; 4] = [0.1, 0.5, 0.9, 0.99];

/// Bucket boundaries for the latency histogram, in seconds.
pub const LATENCY_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Owns the identity of the request instruments and the status-classification
/// policy. Stateless after registration.
pub struct RequestMetricsRecorder {
    registry: Arc<MetricsRegistry>,
    sleep_time: Histogram,
    request_size: Histogram,
    response_size: Histogram,
    status_counters: Vec<Counter>,
}

impl RequestMetricsRecorder {
    /// Registry settings matching this instrument set: the summary quantiles
    /// and the native-histogram buckets for the latency metric.
    pub fn registry_settings() -> RegistrySettings {
        RegistrySettings {
            summary_quantiles: SUMMARY_QUANTILES.to_vec(),
            bucket_overrides: vec![(REQUESTS_LATENCY_SECONDS.to_string(), LATENCY_BUCKETS.to_vec())],
        }
    }

    /// Register the full instrument set with `registry`.
    ///
    /// Must be called exactly once per registry; a second call fails with a
    /// duplicate-metric error on the first instrument name.
    pub fn register(registry: &Arc<MetricsRegistry>) -> Result<Self, MetricsError> {
        registry.register(MetricDefinition::new(
            InstrumentKind::Counter,
            REQUESTS_TOTAL,
            "Requests total",
            &["method", "uri"],
        ))?;
        registry.register(MetricDefinition::new(
            InstrumentKind::Gauge,
            INPROGRESS_REQUESTS,
            "Inprogress Requests",
            &["method", "uri"],
        ))?;
        registry.register(MetricDefinition::new(
            InstrumentKind::Histogram,
            REQUESTS_LATENCY_SECONDS,
            "Request latency in seconds.",
            &["method", "uri"],
        ))?;
        registry.register(MetricDefinition::new(
            InstrumentKind::Summary,
            REQUESTS_LATENCY,
            "Request latency",
            &["method", "uri"],
        ))?;
        registry.register(MetricDefinition::new(
            InstrumentKind::Summary,
            SLEEP_TIME,
            "Sleep time",
            &[],
        ))?;
        registry.register(MetricDefinition::new(
            InstrumentKind::Summary,
            REQUEST_SIZE,
            "Request size",
            &[],
        ))?;
        registry.register(MetricDefinition::new(
            InstrumentKind::Summary,
            RESPONSE_SIZE,
            "Response size",
            &[],
        ))?;

        let mut status_counters = Vec::with_capacity(StatusClass::COUNTED.len());
        for class in StatusClass::COUNTED {
            let (Some(name), Some(help)) = (class.counter_name(), class.help_text()) else {
                continue;
            };
            registry.register(MetricDefinition::new(InstrumentKind::Counter, name, help, &[]))?;
            status_counters.push(registry.counter(name, &[]));
        }

        Ok(Self {
            registry: Arc::clone(registry),
            sleep_time: registry.histogram(SLEEP_TIME, &[]),
            request_size: registry.histogram(REQUEST_SIZE, &[]),
            response_size: registry.histogram(RESPONSE_SIZE, &[]),
            status_counters,
        })
    }

    /// Count a completed response under its status class.
    ///
    /// Codes below 100 or at/above 600 increment nothing.
    pub fn classify_and_count(&self, status_code: u16) {
        if let Some(idx) = StatusClass::from_code(status_code).index() {
            self.status_counters[idx].increment(1);
        }
    }

    pub fn total_requests(&self, method: &str, uri: &str) -> Counter {
        self.registry
            .counter(REQUESTS_TOTAL, &[("method", method), ("uri", uri)])
    }

    pub fn inprogress_requests(&self, method: &str, uri: &str) -> Gauge {
        self.registry
            .gauge(INPROGRESS_REQUESTS, &[("method", method), ("uri", uri)])
    }

    pub fn latency_histogram(&self, method: &str, uri: &str) -> Histogram {
        self.registry
            .histogram(REQUESTS_LATENCY_SECONDS, &[("method", method), ("uri", uri)])
    }

    pub fn latency_summary(&self, method: &str, uri: &str) -> Histogram {
        self.registry
            .histogram(REQUESTS_LATENCY, &[("method", method), ("uri", uri)])
    }

    pub fn sleep_time(&self) -> &Histogram {
        &self.sleep_time
    }

    pub fn request_size(&self) -> &Histogram {
        &self.request_size
    }

    pub fn response_size(&self) -> &Histogram {
        &self.response_size
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (Arc<MetricsRegistry>, RequestMetricsRecorder) {
        let registry = Arc::new(
            MetricsRegistry::new(RequestMetricsRecorder::registry_settings()).unwrap(),
        );
        let recorder = RequestMetricsRecorder::register(&registry).unwrap();
        (registry, recorder)
    }

    fn counter_value(rendered: &str, name: &str) -> u64 {
        rendered
            .lines()
            .find(|l| l.split_whitespace().next() == Some(name))
            .and_then(|l| l.split_whitespace().last())
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| panic!("no sample for {name}"))
    }

    fn status_counts(rendered: &str) -> [u64; 5] {
        [
            counter_value(rendered, "http_1XX_requests_total"),
            counter_value(rendered, "http_2XX_requests_total"),
            counter_value(rendered, "http_3XX_requests_total"),
            counter_value(rendered, "http_4XX_requests_total"),
            counter_value(rendered, "http_5XX_requests_total"),
        ]
    }

    #[test]
    fn registers_all_instruments_by_name() {
        let (registry, _recorder) = fresh();
        for name in [
            REQUESTS_TOTAL,
            INPROGRESS_REQUESTS,
            REQUESTS_LATENCY_SECONDS,
            REQUESTS_LATENCY,
            SLEEP_TIME,
            REQUEST_SIZE,
            RESPONSE_SIZE,
            "http_1XX_requests_total",
            "http_2XX_requests_total",
            "http_3XX_requests_total",
            "http_4XX_requests_total",
            "http_5XX_requests_total",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.definition_count(), 12);
    }

    #[test]
    fn labeled_definitions_carry_method_and_uri() {
        let (registry, _recorder) = fresh();
        for name in [
            REQUESTS_TOTAL,
            INPROGRESS_REQUESTS,
            REQUESTS_LATENCY_SECONDS,
            REQUESTS_LATENCY,
        ] {
            let def = registry.definition(name).unwrap();
            assert_eq!(def.label_names, vec!["method".to_string(), "uri".to_string()]);
        }
        for name in [SLEEP_TIME, REQUEST_SIZE, RESPONSE_SIZE] {
            assert!(registry.definition(name).unwrap().label_names.is_empty());
        }
    }

    #[test]
    fn registering_twice_is_a_duplicate_error() {
        let (registry, _recorder) = fresh();
        match RequestMetricsRecorder::register(&registry) {
            Err(MetricsError::DuplicateMetric(name)) => assert_eq!(name, REQUESTS_TOTAL),
            other => panic!("expected duplicate-metric error, got {:?}", other.map(|_| ())),
        }
        // The failed second attempt must not have grown the definition table.
        assert_eq!(registry.definition_count(), 12);
    }

    #[test]
    fn informational_codes_count_only_1xx() {
        let (registry, recorder) = fresh();
        for code in 100..200 {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [100, 0, 0, 0, 0]);
    }

    #[test]
    fn success_codes_count_only_2xx() {
        let (registry, recorder) = fresh();
        for code in 200..300 {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [0, 100, 0, 0, 0]);
    }

    #[test]
    fn redirection_codes_count_only_3xx() {
        let (registry, recorder) = fresh();
        for code in 300..400 {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [0, 0, 100, 0, 0]);
    }

    #[test]
    fn client_error_codes_count_only_4xx() {
        let (registry, recorder) = fresh();
        for code in 400..500 {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [0, 0, 0, 100, 0]);
    }

    #[test]
    fn server_error_codes_count_only_5xx() {
        let (registry, recorder) = fresh();
        for code in 500..600 {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [0, 0, 0, 0, 100]);
    }

    #[test]
    fn out_of_range_codes_count_nothing() {
        let (registry, recorder) = fresh();
        for code in [0, 1, 42, 99, 600, 601, 999, u16::MAX] {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [0, 0, 0, 0, 0]);
    }

    #[test]
    fn mixed_codes_land_in_their_classes() {
        let (registry, recorder) = fresh();
        for code in [200, 404, 404] {
            recorder.classify_and_count(code);
        }
        assert_eq!(status_counts(&registry.render()), [0, 1, 0, 2, 0]);
    }

    #[test]
    fn request_observations_flow_into_instruments() {
        let (registry, recorder) = fresh();

        recorder.total_requests("GET", "/echo").increment(1);
        let inprogress = recorder.inprogress_requests("GET", "/echo");
        inprogress.increment(1.0);
        recorder.latency_histogram("GET", "/echo").record(0.02);
        recorder.latency_summary("GET", "/echo").record(0.02);
        recorder.sleep_time().record(0.01);
        recorder.request_size().record(64.0);
        recorder.response_size().record(64.0);
        inprogress.decrement(1.0);

        let rendered = registry.render();
        assert!(rendered
            .lines()
            .any(|l| l.starts_with("requests_total{") && l.ends_with(" 1")));
        assert!(rendered
            .lines()
            .any(|l| l.starts_with("inprogress_requests{") && l.ends_with(" 0")));
        assert!(rendered.contains("requests_latency_seconds_bucket"));
        assert!(rendered.contains("# TYPE requests_latency summary"));
        assert!(rendered
            .lines()
            .any(|l| l.trim() == "sleep_time_count 1"));
        assert!(rendered
            .lines()
            .any(|l| l.trim() == "request_size_count 1"));
        assert!(rendered
            .lines()
            .any(|l| l.trim() == "response_size_count 1"));
    }

    #[test]
    fn rendering_is_idempotent_without_new_observations() {
        let (registry, recorder) = fresh();
        recorder.classify_and_count(200);
        recorder.classify_and_count(404);

        let first = status_counts(&registry.render());
        let second = status_counts(&registry.render());
        assert_eq!(first, second);
    }
}
