//! Invocation metrics
//!
//! Every call to the model backend is measured through the `metrics` facade.
//! Without a recorder installed the macros are no-ops, so the library can
//! always emit them.
//!
//! # Metrics
//!
//! - `invocations_total`: Counter of backend calls by model
//! - `invocation_errors_total`: Counter of failed backend calls by model
//! - `invocation_latency_ms`: Histogram of call latency by model and status
//! - `invocations_in_flight`: Gauge of calls awaiting a reply
//! - `comparisons_total`: Counter of comparisons by outcome
//!
//! # Examples
//!
//! ```
//! use promptbench::telemetry::InvocationMetrics;
//!
//! let metrics = InvocationMetrics::start("gpt-4");
//! let latency_ms = metrics.record_success();
//! assert!(latency_ms < 1000);
//! ```

use metrics::{decrement_gauge, histogram, increment_counter, increment_gauge};
use std::cell::Cell;
use std::time::Instant;

/// Measures a single backend invocation
///
/// Created right before the call and finished with `record_success` or
/// `record_error`. Dropping an unfinished tracker still releases the
/// in-flight gauge.
#[derive(Debug)]
pub struct InvocationMetrics {
    model: String,
    start: Instant,
    recorded: Cell<bool>,
}

impl InvocationMetrics {
    /// Starts measuring a call to `model`
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier used as the metric label
    pub fn start(model: impl Into<String>) -> Self {
        let model = model.into();
        increment_counter!("invocations_total", "model" => model.clone());
        increment_gauge!("invocations_in_flight", 1.0);

        Self {
            model,
            start: Instant::now(),
            recorded: Cell::new(false),
        }
    }

    /// Milliseconds since the call started
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Records a successful call and returns its latency in milliseconds
    pub fn record_success(&self) -> u64 {
        self.finish("success")
    }

    /// Records a failed call and returns its latency in milliseconds
    pub fn record_error(&self) -> u64 {
        if !self.recorded.get() {
            increment_counter!("invocation_errors_total", "model" => self.model.clone());
        }
        self.finish("error")
    }

    fn finish(&self, status: &'static str) -> u64 {
        let latency_ms = self.elapsed_ms();
        if self.recorded.replace(true) {
            return latency_ms;
        }

        histogram!(
            "invocation_latency_ms",
            latency_ms as f64,
            "model" => self.model.clone(),
            "status" => status
        );
        decrement_gauge!("invocations_in_flight", 1.0);

        latency_ms
    }

    /// Model label of this tracker
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Drop for InvocationMetrics {
    fn drop(&mut self) {
        if !self.recorded.get() {
            decrement_gauge!("invocations_in_flight", 1.0);
        }
    }
}

/// Records the outcome of a comparison
///
/// # Arguments
///
/// * `outcome` - "complete" or "failed"
/// * `model_count` - Number of models that were compared
pub fn record_comparison(outcome: &'static str, model_count: usize) {
    increment_counter!(
        "comparisons_total",
        "outcome" => outcome,
        "models" => model_count.to_string()
    );
}

/// Initializes the metrics exporter for Prometheus
///
/// Only has an effect when compiled with the `prometheus` feature; otherwise
/// it is safe to call and does nothing.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
