//! In-process metrics registry
//!
//! One counter/histogram/gauge interface for the whole service, with the
//! wire format behind a pluggable [`MetricsExporter`]. Histograms keep a
//! bounded window of recent observations and export summary statistics.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::RwLock;

use serde_json::json;

const HISTOGRAM_WINDOW: usize = 1000;

/// Thread-safe metrics collection
#[derive(Default)]
pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, f64>>,
    histograms: RwLock<HashMap<String, VecDeque<f64>>>,
    gauges: RwLock<BTreeMap<String, f64>>,
}

impl MetricsRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(name: &str, labels: &[(&str, &str)]) -> String {
        if labels.is_empty() {
            return name.to_owned();
        }
        let mut labels: Vec<(&str, &str)> = labels.to_vec();
        labels.sort_unstable();
        let rendered: Vec<String> = labels
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        format!("{name}{{{}}}", rendered.join(","))
    }

    /// Increment a counter by `value`.
    pub fn inc_counter_by(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        if let Ok(mut counters) = self.counters.write() {
            *counters.entry(Self::make_key(name, labels)).or_insert(0.0) += value;
        }
    }

    /// Increment a counter by one.
    pub fn inc_counter(&self, name: &str, labels: &[(&str, &str)]) {
        self.inc_counter_by(name, labels, 1.0);
    }

    /// Record a duration observation in milliseconds.
    pub fn record_duration(&self, name: &str, duration_ms: f64) {
        if let Ok(mut histograms) = self.histograms.write() {
            let window = histograms.entry(name.to_owned()).or_default();
            window.push_back(duration_ms);
            while window.len() > HISTOGRAM_WINDOW {
                window.pop_front();
            }
        }
    }

    /// Set a gauge value.
    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        if let Ok(mut gauges) = self.gauges.write() {
            gauges.insert(Self::make_key(name, labels), value);
        }
    }

    /// Counter value for tests and readiness checks (0 when absent).
    #[must_use]
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.counters
            .read()
            .ok()
            .and_then(|counters| counters.get(&Self::make_key(name, labels)).copied())
            .unwrap_or(0.0)
    }

    /// Snapshot of all collected metrics.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        let counters = self
            .counters
            .read()
            .map(|counters| counters.clone())
            .unwrap_or_default();
        let gauges = self
            .gauges
            .read()
            .map(|gauges| gauges.clone())
            .unwrap_or_default();

        let mut histograms = serde_json::Map::new();
        if let Ok(windows) = self.histograms.read() {
            for (name, window) in windows.iter() {
                if window.is_empty() {
                    continue;
                }
                let mut values: Vec<f64> = window.iter().copied().collect();
                values.sort_by(f64::total_cmp);
                let n = values.len();
                let sum: f64 = values.iter().sum();
                #[allow(clippy::cast_precision_loss)]
                let mean = sum / n as f64;
                let percentile = |q: f64| {
                    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                    #[allow(clippy::cast_precision_loss)]
                    let index = ((n as f64 * q) as usize).min(n - 1);
                    values[index]
                };
                histograms.insert(
                    name.clone(),
                    json!({
                        "count": n,
                        "sum": sum,
                        "min": values[0],
                        "max": values[n - 1],
                        "mean": mean,
                        "p50": percentile(0.5),
                        "p95": percentile(0.95),
                        "p99": percentile(0.99),
                    }),
                );
            }
        }

        json!({
            "counters": counters,
            "histograms": histograms,
            "gauges": gauges,
        })
    }
}

impl ragd_domain::ports::MetricsSink for MetricsRegistry {
    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]) {
        Self::inc_counter(self, name, labels);
    }

    fn inc_counter_by(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        Self::inc_counter_by(self, name, labels, value);
    }

    fn record_duration(&self, name: &str, duration_ms: f64) {
        Self::record_duration(self, name, duration_ms);
    }

    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        Self::set_gauge(self, name, labels, value);
    }
}

/// Wire-format adapter over registry snapshots
pub trait MetricsExporter: Send + Sync {
    /// MIME type of the exported document
    fn content_type(&self) -> &str;

    /// Render a snapshot into the exporter's wire format.
    fn export(&self, snapshot: &serde_json::Value) -> String;
}

/// JSON exporter backing the `/metrics` endpoint
#[derive(Debug, Default)]
pub struct JsonExporter;

impl MetricsExporter for JsonExporter {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn export(&self, snapshot: &serde_json::Value) -> String {
        serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_label_set() {
        let registry = MetricsRegistry::new();
        registry.inc_counter("ingest_jobs_created", &[("document_type", "text")]);
        registry.inc_counter("ingest_jobs_created", &[("document_type", "text")]);
        registry.inc_counter("ingest_jobs_created", &[("document_type", "html")]);

        assert_eq!(
            registry.counter_value("ingest_jobs_created", &[("document_type", "text")]),
            2.0
        );
        assert_eq!(
            registry.counter_value("ingest_jobs_created", &[("document_type", "html")]),
            1.0
        );
        assert_eq!(registry.counter_value("unknown", &[]), 0.0);
    }

    #[test]
    fn label_order_does_not_change_the_key() {
        let registry = MetricsRegistry::new();
        registry.inc_counter("m", &[("a", "1"), ("b", "2")]);
        registry.inc_counter("m", &[("b", "2"), ("a", "1")]);
        assert_eq!(registry.counter_value("m", &[("a", "1"), ("b", "2")]), 2.0);
    }

    #[test]
    fn histogram_summaries_cover_the_window() {
        let registry = MetricsRegistry::new();
        for value in 1..=100 {
            registry.record_duration("query_duration_ms", f64::from(value));
        }

        let snapshot = registry.snapshot();
        let summary = &snapshot["histograms"]["query_duration_ms"];
        assert_eq!(summary["count"], 100);
        assert_eq!(summary["min"], 1.0);
        assert_eq!(summary["max"], 100.0);
        assert_eq!(summary["p50"], 51.0);
        assert!(summary["p95"].as_f64().expect("p95") >= 95.0);
    }

    #[test]
    fn json_exporter_renders_a_snapshot() {
        let registry = MetricsRegistry::new();
        registry.set_gauge("active_jobs", &[], 3.0);
        let exporter = JsonExporter;
        assert_eq!(exporter.content_type(), "application/json");
        let body = exporter.export(&registry.snapshot());
        assert!(body.contains("active_jobs"));
    }
}
