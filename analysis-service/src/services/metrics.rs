//! Metrics collection and Prometheus export.
//!
//! Installs the global `metrics` recorder and renders it for `/metrics`.
//! Recording helpers are no-ops until [`init_metrics`] has run.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    let builder = match PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), LATENCY_BUCKETS)
    {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid histogram buckets, using summaries");
            PrometheusBuilder::new()
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
            tracing::info!("Prometheus metrics initialized");
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one model invocation. `outcome` is `success` or an error kind.
pub fn record_model_call(model: &str, outcome: &str, duration_secs: f64) {
    let labels = [("model", model.to_string()), ("outcome", outcome.to_string())];
    counter!("model_invocations_total", &labels).increment(1);
    histogram!("model_invocation_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

pub fn record_image_normalized(duration_secs: f64) {
    histogram!("image_normalization_duration_seconds").record(duration_secs);
}
