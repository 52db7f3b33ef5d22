//! Observability infrastructure for the risk predictor
//!
//! Provides:
//! - Prometheus metrics (request latency, per-cell outcomes, model loads, cache size)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RiskMetricsInner> = OnceLock::new();

struct RiskMetricsInner {
    prediction_latency_seconds: Histogram,
    cell_outcomes: IntCounterVec,
    model_load_latency_seconds: Histogram,
    model_load_failures: IntCounter,
    cached_models: IntGauge,
    artifacts_available: IntGauge,
    artifacts_expected: IntGauge,
    rejected_requests: IntCounter,
}

impl RiskMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "risk_prediction_latency_seconds",
                "Time spent dispatching one prediction request across all targets",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            cell_outcomes: register_int_counter_vec!(
                "risk_cell_outcomes_total",
                "Per (target, family) cell outcomes",
                &["family", "outcome"]
            )
            .expect("Failed to register cell_outcomes"),

            model_load_latency_seconds: register_histogram!(
                "risk_model_load_latency_seconds",
                "Time spent reading and decoding a model artifact",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register model_load_latency_seconds"),

            model_load_failures: register_int_counter!(
                "risk_model_load_failures_total",
                "Artifacts that existed but could not be read or decoded"
            )
            .expect("Failed to register model_load_failures"),

            cached_models: register_int_gauge!(
                "risk_cached_models",
                "Number of decoded models held in the store cache"
            )
            .expect("Failed to register cached_models"),

            artifacts_available: register_int_gauge!(
                "risk_artifacts_available",
                "Number of (target, family) artifacts present in storage"
            )
            .expect("Failed to register artifacts_available"),

            artifacts_expected: register_int_gauge!(
                "risk_artifacts_expected",
                "Number of configured (target, family) pairs"
            )
            .expect("Failed to register artifacts_expected"),

            rejected_requests: register_int_counter!(
                "risk_rejected_requests_total",
                "Prediction requests rejected for missing or invalid input"
            )
            .expect("Failed to register rejected_requests"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct RiskMetrics {
    _private: (),
}

impl Default for RiskMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RiskMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RiskMetricsInner {
        GLOBAL_METRICS.get_or_init(RiskMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Count one cell outcome (`predicted`, `not_available` or `error`)
    pub fn inc_cell_outcome(&self, family: &str, outcome: &str) {
        self.inner()
            .cell_outcomes
            .with_label_values(&[family, outcome])
            .inc();
    }

    pub fn observe_model_load_latency(&self, duration_secs: f64) {
        self.inner().model_load_latency_seconds.observe(duration_secs);
    }

    pub fn inc_model_load_failures(&self) {
        self.inner().model_load_failures.inc();
    }

    pub fn set_cached_models(&self, count: i64) {
        self.inner().cached_models.set(count);
    }

    pub fn set_artifact_coverage(&self, available: i64, expected: i64) {
        self.inner().artifacts_available.set(available);
        self.inner().artifacts_expected.set(expected);
    }

    pub fn inc_rejected_requests(&self) {
        self.inner().rejected_requests.inc();
    }
}

/// Per-request cell tallies reported after dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellTally {
    pub predicted: usize,
    pub not_available: usize,
    pub errors: usize,
}

/// Structured logger for service events
///
/// Every event carries an `event` field so log pipelines can filter on it.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_location: &str, artifact_format: &str) {
        info!(
            event = "service_started",
            node = %self.node_name,
            version = %version,
            model_location = %model_location,
            artifact_format = %artifact_format,
            "Risk predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Risk predictor shutting down"
        );
    }

    pub fn log_prediction(&self, targets: usize, tally: CellTally, elapsed_ms: u128) {
        info!(
            event = "prediction_served",
            node = %self.node_name,
            targets = targets,
            predicted = tally.predicted,
            not_available = tally.not_available,
            errors = tally.errors,
            elapsed_ms = elapsed_ms,
            "Served risk prediction"
        );
    }

    pub fn log_cell_failure(&self, target: &str, family: &str, artifact: &str, error: &str) {
        warn!(
            event = "cell_failed",
            node = %self.node_name,
            target = %target,
            family = %family,
            artifact = %artifact,
            error = %error,
            "Prediction cell failed"
        );
    }

    pub fn log_model_loaded(&self, artifact: &str, backend: &str, checksum: &str, elapsed_ms: u128) {
        info!(
            event = "model_loaded",
            node = %self.node_name,
            artifact = %artifact,
            backend = %backend,
            checksum = %checksum,
            elapsed_ms = elapsed_ms,
            "Loaded model artifact"
        );
    }

    pub fn log_cache_refresh(&self, invalidated: usize, remaining: usize) {
        info!(
            event = "model_cache_refreshed",
            node = %self.node_name,
            invalidated = invalidated,
            remaining = remaining,
            "Model cache refreshed"
        );
    }
}
