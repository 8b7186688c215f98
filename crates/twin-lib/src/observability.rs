//! Observability infrastructure for the battery twin
//!
//! Provides:
//! - Prometheus metrics (generator throughput, persistence failures, prediction latency, fallbacks)
//! - Structured JSON logging with tracing

use crate::models::{Reading, TripPhase};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<TwinMetricsInner> = OnceLock::new();

struct TwinMetricsInner {
    readings_generated: IntCounter,
    phase_transitions: IntCounterVec,
    persist_errors: IntCounter,
    prediction_latency_seconds: Histogram,
    predictions: IntCounterVec,
    inference_errors: IntCounter,
    fallbacks: IntCounter,
    models_loaded: IntGauge,
}

impl TwinMetricsInner {
    fn new() -> Self {
        Self {
            readings_generated: register_int_counter!(
                "battery_twin_readings_generated_total",
                "Telemetry readings produced by the generator"
            )
            .expect("Failed to register readings_generated"),

            phase_transitions: register_int_counter_vec!(
                "battery_twin_phase_transitions_total",
                "Trip phase transitions, labelled by the phase entered",
                &["to"]
            )
            .expect("Failed to register phase_transitions"),

            persist_errors: register_int_counter!(
                "battery_twin_persist_errors_total",
                "Failed writes of the telemetry document"
            )
            .expect("Failed to register persist_errors"),

            prediction_latency_seconds: register_histogram!(
                "battery_twin_prediction_latency_seconds",
                "Time spent serving a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions: register_int_counter_vec!(
                "battery_twin_predictions_total",
                "Prediction requests served, labelled by endpoint",
                &["endpoint"]
            )
            .expect("Failed to register predictions"),

            inference_errors: register_int_counter!(
                "battery_twin_inference_errors_total",
                "Model inference failures"
            )
            .expect("Failed to register inference_errors"),

            fallbacks: register_int_counter!(
                "battery_twin_fallbacks_total",
                "Predictions answered by the heuristic fallback"
            )
            .expect("Failed to register fallbacks"),

            models_loaded: register_int_gauge!(
                "battery_twin_models_loaded",
                "Number of models held by the registry"
            )
            .expect("Failed to register models_loaded"),
        }
    }
}

/// Lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct TwinMetrics {
    _private: (),
}

impl Default for TwinMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TwinMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(TwinMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &TwinMetricsInner {
        GLOBAL_METRICS.get_or_init(TwinMetricsInner::new)
    }

    pub fn inc_readings_generated(&self) {
        self.inner().readings_generated.inc();
    }

    pub fn inc_phase_transition(&self, to: TripPhase) {
        self.inner()
            .phase_transitions
            .with_label_values(&[to.as_str()])
            .inc();
    }

    pub fn inc_persist_errors(&self) {
        self.inner().persist_errors.inc();
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, endpoint: &str) {
        self.inner().predictions.with_label_values(&[endpoint]).inc();
    }

    pub fn inc_inference_errors(&self) {
        self.inner().inference_errors.inc();
    }

    pub fn inc_fallbacks(&self) {
        self.inner().fallbacks.inc();
    }

    pub fn set_models_loaded(&self, count: i64) {
        self.inner().models_loaded.set(count);
    }

    pub fn readings_generated(&self) -> u64 {
        self.inner().readings_generated.get()
    }
}

/// Structured logger for twin events
///
/// Provides consistent JSON-formatted logging for generator and
/// prediction events.
#[derive(Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn log_startup(&self, version: &str, models_loaded: usize) {
        info!(
            event = "service_started",
            source = %self.source,
            version = %version,
            models_loaded = models_loaded,
            "Battery twin started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            source = %self.source,
            reason = %reason,
            "Battery twin shutting down"
        );
    }

    pub fn log_phase_change(&self, from: TripPhase, to: TripPhase, dwell_ticks: u32) {
        info!(
            event = "phase_changed",
            source = %self.source,
            from = %from,
            to = %to,
            dwell_ticks = dwell_ticks,
            "Trip phase changed"
        );
    }

    pub fn log_reading(&self, reading: &Reading) {
        debug!(
            event = "reading_generated",
            source = %self.source,
            reading_number = reading.reading_number,
            voltage = reading.voltage,
            current = reading.current,
            temperature = reading.temperature,
            soc = reading.soc,
            soh = reading.soh,
            phase = %reading.trip_phase,
            "Reading generated"
        );
    }

    pub fn log_prediction(&self, endpoint: &str, model: &str, value: f64, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            source = %self.source,
            endpoint = %endpoint,
            model = %model,
            value = value,
            elapsed_us = elapsed_us,
            "Prediction served"
        );
    }

    pub fn log_fallback(&self, reason: &str) {
        warn!(
            event = "fallback_used",
            source = %self.source,
            reason = %reason,
            "Model path unavailable, answering with heuristic fallback"
        );
    }

    pub fn log_persist_failure(&self, path: &str, error: &str, consecutive: u64) {
        warn!(
            event = "document_persist_failed",
            source = %self.source,
            path = %path,
            error = %error,
            consecutive_failures = consecutive,
            "Failed to persist telemetry document, retrying next tick"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twin_metrics_creation() {
        let metrics = TwinMetrics::new();
        let before = metrics.readings_generated();

        metrics.inc_readings_generated();
        metrics.inc_phase_transition(TripPhase::City);
        metrics.inc_persist_errors();
        metrics.observe_prediction_latency(0.002);
        metrics.inc_predictions("soh");
        metrics.inc_inference_errors();
        metrics.inc_fallbacks();
        metrics.set_models_loaded(4);

        assert!(metrics.readings_generated() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("twin-api");
        assert_eq!(logger.source, "twin-api");
    }
}
