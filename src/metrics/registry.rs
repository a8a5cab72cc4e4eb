//! Explicit metrics registry backed by the Prometheus recorder.
//!
//! The registry owns metric identity: a definition (name, help text, label
//! names, instrument kind) is registered exactly once, and registering the
//! same name twice is an error rather than a silent overwrite. Instrument
//! storage, atomicity of concurrent updates, and quantile/bucket math all
//! live in `metrics-exporter-prometheus`; the registry only adds the
//! definition table and hands out live instrument handles.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Label, Level, Metadata, Recorder, SharedString, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::shared::errors::MetricsError;

/// Instrument kind of a [`MetricDefinition`].
///
/// Summaries are histograms without bucket boundaries; the exporter renders
/// them as quantile estimates instead of cumulative buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

/// Identity of a metric: name, help text and label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub kind: InstrumentKind,
}

impl MetricDefinition {
    pub fn new(kind: InstrumentKind, name: &str, help: &str, label_names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            kind,
        }
    }
}

/// Recorder-level settings fixed at registry construction.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Quantiles reported for summary instruments
    pub summary_quantiles: Vec<f64>,
    /// Bucket boundaries for metrics rendered as native histograms
    pub bucket_overrides: Vec<(String, Vec<f64>)>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            summary_quantiles: vec![0.1, 0.5, 0.9, 0.99],
            bucket_overrides: Vec::new(),
        }
    }
}

/// Shareable registry of metric definitions and their live instruments.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    definitions: DashMap<String, MetricDefinition>,
}

impl MetricsRegistry {
    pub fn new(settings: RegistrySettings) -> Result<Self, MetricsError> {
        let mut builder = PrometheusBuilder::new()
            .set_quantiles(&settings.summary_quantiles)
            .map_err(|e| MetricsError::Settings(e.to_string()))?;
        for (name, buckets) in &settings.bucket_overrides {
            builder = builder
                .set_buckets_for_metric(Matcher::Full(name.clone()), buckets)
                .map_err(|e| MetricsError::Settings(e.to_string()))?;
        }
        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        Ok(Self {
            recorder,
            handle,
            definitions: DashMap::new(),
        })
    }

    /// Register a metric definition.
    ///
    /// Publishes the help text and, for unlabeled metrics, eagerly creates the
    /// series so it is rendered at its zero value before the first update.
    /// Registering a name that already exists fails.
    pub fn register(&self, def: MetricDefinition) -> Result<(), MetricsError> {
        match self.definitions.entry(def.name.clone()) {
            Entry::Occupied(_) => {
                return Err(MetricsError::DuplicateMetric(def.name));
            }
            Entry::Vacant(slot) => {
                slot.insert(def.clone());
            }
        }

        let name = KeyName::from(def.name.clone());
        let help = SharedString::from(def.help.clone());
        match def.kind {
            InstrumentKind::Counter => self.recorder.describe_counter(name, None, help),
            InstrumentKind::Gauge => self.recorder.describe_gauge(name, None, help),
            InstrumentKind::Histogram | InstrumentKind::Summary => {
                self.recorder.describe_histogram(name, None, help)
            }
        }

        if def.label_names.is_empty() {
            let key = Key::from_name(def.name.clone());
            match def.kind {
                InstrumentKind::Counter => {
                    self.recorder.register_counter(&key, &metadata());
                }
                InstrumentKind::Gauge => {
                    self.recorder.register_gauge(&key, &metadata());
                }
                InstrumentKind::Histogram | InstrumentKind::Summary => {
                    self.recorder.register_histogram(&key, &metadata());
                }
            }
        }

        Ok(())
    }

    /// Live counter instance for a label-value tuple.
    pub fn counter(&self, name: &str, labels: &[(&'static str, &str)]) -> Counter {
        self.recorder.register_counter(&key_for(name, labels), &metadata())
    }

    /// Live gauge instance for a label-value tuple.
    pub fn gauge(&self, name: &str, labels: &[(&'static str, &str)]) -> Gauge {
        self.recorder.register_gauge(&key_for(name, labels), &metadata())
    }

    /// Live histogram (or summary) instance for a label-value tuple.
    pub fn histogram(&self, name: &str, labels: &[(&'static str, &str)]) -> Histogram {
        self.recorder.register_histogram(&key_for(name, labels), &metadata())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<MetricDefinition> {
        self.definitions.get(name).map(|d| d.value().clone())
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Current value of every instrument in text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn handle(&self) -> PrometheusHandle {
        self.handle.clone()
    }

    /// Install this registry as the drain for the `metrics` facade macros.
    ///
    /// Needed by collectors that record through the facade rather than through
    /// instrument handles (e.g. the process collector). A process can only
    /// hold one installed recorder; a second installation fails.
    pub fn install_global(self: &Arc<Self>) -> Result<(), MetricsError> {
        metrics::set_global_recorder(FacadeRecorder(Arc::clone(self)))
            .map_err(|_| MetricsError::RecorderInstalled)
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

fn key_for(name: &str, labels: &[(&'static str, &str)]) -> Key {
    if labels.is_empty() {
        Key::from_name(name.to_string())
    } else {
        let labels: Vec<Label> = labels
            .iter()
            .map(|(k, v)| Label::new(*k, v.to_string()))
            .collect();
        Key::from_parts(name.to_string(), labels)
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// Forwards facade-macro traffic into the registry's recorder.
struct FacadeRecorder(Arc<MetricsRegistry>);

impl Recorder for FacadeRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.0.recorder.describe_counter(key, unit, description)
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.0.recorder.describe_gauge(key, unit, description)
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.0.recorder.describe_histogram(key, unit, description)
    }

    fn register_counter(&self, key: &Key, metadata: &Metadata<'_>) -> Counter {
        self.0.recorder.register_counter(key, metadata)
    }

    fn register_gauge(&self, key: &Key, metadata: &Metadata<'_>) -> Gauge {
        self.0.recorder.register_gauge(key, metadata)
    }

    fn register_histogram(&self, key: &Key, metadata: &Metadata<'_>) -> Histogram {
        self.0.recorder.register_histogram(key, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MetricsRegistry {
        MetricsRegistry::new(RegistrySettings::default()).unwrap()
    }

    #[test]
    fn registers_and_looks_up_definitions() {
        let registry = registry();
        registry
            .register(MetricDefinition::new(
                InstrumentKind::Counter,
                "jobs_total",
                "Jobs total",
                &["kind"],
            ))
            .unwrap();

        assert!(registry.contains("jobs_total"));
        assert!(!registry.contains("unknown_metric"));
        let def = registry.definition("jobs_total").unwrap();
        assert_eq!(def.help, "Jobs total");
        assert_eq!(def.label_names, vec!["kind".to_string()]);
        assert_eq!(def.kind, InstrumentKind::Counter);
        assert_eq!(registry.definition_count(), 1);
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let registry = registry();
        let def = MetricDefinition::new(InstrumentKind::Gauge, "queue_depth", "Queue depth", &[]);
        registry.register(def.clone()).unwrap();

        match registry.register(def) {
            Err(MetricsError::DuplicateMetric(name)) => assert_eq!(name, "queue_depth"),
            other => panic!("expected duplicate-metric error, got {other:?}"),
        }
        assert_eq!(registry.definition_count(), 1);
    }

    #[test]
    fn unlabeled_metrics_render_at_zero() {
        let registry = registry();
        registry
            .register(MetricDefinition::new(
                InstrumentKind::Counter,
                "restarts_total",
                "Restarts total",
                &[],
            ))
            .unwrap();

        let rendered = registry.render();
        assert!(rendered.contains("# HELP restarts_total Restarts total"));
        assert!(rendered.contains("# TYPE restarts_total counter"));
        assert!(rendered
            .lines()
            .any(|l| l.trim() == "restarts_total 0"));
    }

    #[test]
    fn labeled_instances_record_independently() {
        let registry = registry();
        registry
            .register(MetricDefinition::new(
                InstrumentKind::Counter,
                "jobs_total",
                "Jobs total",
                &["kind"],
            ))
            .unwrap();

        registry.counter("jobs_total", &[("kind", "import")]).increment(2);
        registry.counter("jobs_total", &[("kind", "export")]).increment(1);

        let rendered = registry.render();
        assert!(rendered
            .lines()
            .any(|l| l.starts_with("jobs_total{") && l.contains("import") && l.ends_with(" 2")));
        assert!(rendered
            .lines()
            .any(|l| l.starts_with("jobs_total{") && l.contains("export") && l.ends_with(" 1")));
    }

    #[test]
    fn empty_quantile_list_is_rejected() {
        let settings = RegistrySettings {
            summary_quantiles: Vec::new(),
            bucket_overrides: Vec::new(),
        };
        assert!(matches!(
            MetricsRegistry::new(settings),
            Err(MetricsError::Settings(_))
        ));
    }

    #[test]
    fn bucket_override_renders_native_histogram() {
        let settings = RegistrySettings {
            bucket_overrides: vec![("io_latency_seconds".to_string(), vec![0.01, 0.1, 1.0])],
            ..RegistrySettings::default()
        };
        let registry = MetricsRegistry::new(settings).unwrap();
        registry
            .register(MetricDefinition::new(
                InstrumentKind::Histogram,
                "io_latency_seconds",
                "IO latency",
                &[],
            ))
            .unwrap();
        registry.histogram("io_latency_seconds", &[]).record(0.05);

        let rendered = registry.render();
        assert!(rendered.contains("# TYPE io_latency_seconds histogram"));
        assert!(rendered.contains("io_latency_seconds_bucket"));
        assert!(rendered.contains("le=\"0.1\""));
    }

    #[test]
    fn summaries_render_configured_quantiles() {
        let registry = registry();
        registry
            .register(MetricDefinition::new(
                InstrumentKind::Summary,
                "payload_bytes",
                "Payload size",
                &[],
            ))
            .unwrap();
        registry.histogram("payload_bytes", &[]).record(128.0);

        let rendered = registry.render();
        assert!(rendered.contains("# TYPE payload_bytes summary"));
        assert!(rendered.contains("quantile=\"0.5\""));
        assert!(rendered.contains("quantile=\"0.99\""));
        assert!(rendered.contains("payload_bytes_count 1"));
    }
}
