//! Structured logging with tracing
//!
//! One subscriber for the whole process: env-filtered (`RUST_LOG`,
//! default `info`), JSON output when `LOG_STRUCTURED` is set. The OTLP
//! endpoint is logged at startup as the observability contract point; the
//! exporter itself lives outside this service.

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored (keeps tests that
/// each bootstrap the stack from panicking).
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.log_structured {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if result.is_ok() {
        tracing::info!(
            service = %config.otel_service_name,
            otlp_endpoint = config.otel_exporter_otlp_endpoint.as_deref().unwrap_or("disabled"),
            sample_rate = config.otel_sample_rate,
            structured = config.log_structured,
            "logging initialized"
        );
    }
}
