//! Metrics Sink Port
//!
//! Single counter/histogram/gauge interface; the wire format lives behind
//! an exporter on the infrastructure side.

/// Port for recording metrics
pub trait MetricsSink: Send + Sync {
    /// Increment a counter by one.
    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]);

    /// Increment a counter by an arbitrary amount.
    fn inc_counter_by(&self, name: &str, labels: &[(&str, &str)], value: f64);

    /// Record a duration observation in milliseconds.
    fn record_duration(&self, name: &str, duration_ms: f64);

    /// Set a gauge value.
    fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64);
}
