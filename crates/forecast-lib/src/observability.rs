//! Observability for the forecast pipeline
//!
//! Provides:
//! - Prometheus metrics (catalog load, training and prediction latency,
//!   catalog size, degraded mode, model generation)
//! - Structured event logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for catalog fetches and single predictions (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Histogram buckets for training runs (seconds)
const TRAINING_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Process-wide metrics; `None` when registration failed
static GLOBAL_METRICS: OnceLock<Option<PipelineMetricsInner>> = OnceLock::new();

struct PipelineMetricsInner {
    catalog_load_seconds: Histogram,
    training_duration_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    catalog_records: IntGauge,
    catalog_degraded: IntGauge,
    model_generation: IntGauge,
    predictions_total: IntCounter,
    catalog_fallbacks_total: IntCounter,
    training_failures_total: IntCounter,
}

impl PipelineMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            catalog_load_seconds: register_histogram!(
                "reorder_forecast_catalog_load_seconds",
                "Time spent loading the inventory catalog",
                LATENCY_BUCKETS.to_vec()
            )?,
            training_duration_seconds: register_histogram!(
                "reorder_forecast_training_duration_seconds",
                "Time spent fitting the reorder classifier",
                TRAINING_BUCKETS.to_vec()
            )?,
            prediction_latency_seconds: register_histogram!(
                "reorder_forecast_prediction_latency_seconds",
                "Time spent scoring a single record",
                LATENCY_BUCKETS.to_vec()
            )?,
            catalog_records: register_int_gauge!(
                "reorder_forecast_catalog_records",
                "Number of records in the loaded catalog"
            )?,
            catalog_degraded: register_int_gauge!(
                "reorder_forecast_catalog_degraded",
                "1 while the pipeline is serving a synthetic catalog"
            )?,
            model_generation: register_int_gauge!(
                "reorder_forecast_model_generation",
                "Generation of the most recently started training run"
            )?,
            predictions_total: register_int_counter!(
                "reorder_forecast_predictions_total",
                "Total number of reorder probabilities produced"
            )?,
            catalog_fallbacks_total: register_int_counter!(
                "reorder_forecast_catalog_fallbacks_total",
                "Total number of catalog loads that fell back to synthetic data"
            )?,
            training_failures_total: register_int_counter!(
                "reorder_forecast_training_failures_total",
                "Total number of failed training runs"
            )?,
        })
    }
}

/// Pipeline metrics for Prometheus exposition.
///
/// A lightweight handle to the process-wide instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Create a handle, registering the metrics on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match PipelineMetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register pipeline metrics, metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&PipelineMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_catalog_load(&self, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.catalog_load_seconds.observe(duration_secs);
        }
    }

    pub fn observe_training(&self, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.training_duration_seconds.observe(duration_secs);
        }
    }

    /// Record one produced probability and its latency
    pub fn observe_prediction(&self, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.prediction_latency_seconds.observe(duration_secs);
            m.predictions_total.inc();
        }
    }

    /// Update catalog gauges after a load
    pub fn set_catalog(&self, records: usize, degraded: bool) {
        if let Some(m) = self.inner() {
            m.catalog_records.set(records as i64);
            m.catalog_degraded.set(i64::from(degraded));
        }
    }

    pub fn set_model_generation(&self, generation: u64) {
        if let Some(m) = self.inner() {
            m.model_generation.set(generation as i64);
        }
    }

    pub fn inc_catalog_fallbacks(&self) {
        if let Some(m) = self.inner() {
            m.catalog_fallbacks_total.inc();
        }
    }

    pub fn inc_training_failures(&self) {
        if let Some(m) = self.inner() {
            m.training_failures_total.inc();
        }
    }
}

/// Structured logger for pipeline events.
///
/// Every record carries an `event` tag and the service name so log
/// pipelines can filter without parsing messages.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_catalog_loaded(&self, source: &str, records: usize, elapsed_ms: u128) {
        info!(
            event = "catalog_loaded",
            service = %self.service,
            source = %source,
            records = records,
            elapsed_ms = elapsed_ms,
            "Inventory catalog loaded"
        );
    }

    pub fn log_catalog_fallback(&self, source: &str, cause: &str, synthetic_records: usize) {
        warn!(
            event = "catalog_fallback",
            service = %self.service,
            source = %source,
            cause = %cause,
            synthetic_records = synthetic_records,
            "Catalog unavailable, serving synthetic records"
        );
    }

    pub fn log_training_started(&self, rows: usize, positive_rows: usize, epochs: usize) {
        info!(
            event = "training_started",
            service = %self.service,
            rows = rows,
            positive_rows = positive_rows,
            epochs = epochs,
            "Training started"
        );
    }

    pub fn log_training_completed(
        &self,
        generation: u64,
        rows: usize,
        final_loss: f64,
        training_accuracy: f64,
        elapsed_ms: u128,
    ) {
        info!(
            event = "training_completed",
            service = %self.service,
            generation = generation,
            rows = rows,
            final_loss = final_loss,
            training_accuracy = training_accuracy,
            elapsed_ms = elapsed_ms,
            "Training completed"
        );
    }

    pub fn log_training_failed(&self, cause: &str) {
        warn!(
            event = "training_failed",
            service = %self.service,
            cause = %cause,
            "Training failed, classifier discarded"
        );
    }

    pub fn log_startup(&self, version: &str, catalog_source: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            catalog_source = %catalog_source,
            "Forecast service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Forecast service shutting down"
        );
    }
}
