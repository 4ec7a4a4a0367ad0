//! Observability infrastructure for the advisor
//!
//! Provides:
//! - Prometheus metrics (run latency, recommendations by category, unit
//!   failures by heuristic, provider calls by operation)
//! - Structured logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::heuristics::HeuristicKind;
use crate::models::{Category, Recommendation};
use crate::partial::UnitFailure;
use crate::provider::Operation;

/// Histogram buckets for heuristic run latency (in seconds)
const RUN_LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdvisorMetricsInner> = OnceLock::new();

struct AdvisorMetricsInner {
    run_latency_seconds: HistogramVec,
    recommendations_total: IntCounterVec,
    unit_failures_total: IntCounterVec,
    provider_calls_total: IntCounterVec,
}

impl AdvisorMetricsInner {
    fn new() -> Self {
        Self {
            run_latency_seconds: register_histogram_vec!(
                "advisor_run_latency_seconds",
                "Time spent evaluating one heuristic across all requested profiles",
                &["heuristic"],
                RUN_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register run_latency_seconds"),

            recommendations_total: register_int_counter_vec!(
                "advisor_recommendations_total",
                "Recommendations produced, by category",
                &["category"]
            )
            .expect("Failed to register recommendations_total"),

            unit_failures_total: register_int_counter_vec!(
                "advisor_unit_failures_total",
                "Units of work that failed, by heuristic",
                &["heuristic"]
            )
            .expect("Failed to register unit_failures_total"),

            provider_calls_total: register_int_counter_vec!(
                "advisor_provider_calls_total",
                "Calls made to the cloud provider, by operation and outcome",
                &["operation", "outcome"]
            )
            .expect("Failed to register provider_calls_total"),
        }
    }
}

/// Handle to the process-wide advisor metrics. Clones share the same
/// underlying collectors.
#[derive(Clone)]
pub struct AdvisorMetrics {
    _private: (),
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdvisorMetricsInner {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new)
    }

    pub fn observe_run_latency(&self, kind: HeuristicKind, duration_secs: f64) {
        self.inner()
            .run_latency_seconds
            .with_label_values(&[kind.as_str()])
            .observe(duration_secs);
    }

    pub fn inc_recommendations(&self, category: Category) {
        self.inner()
            .recommendations_total
            .with_label_values(&[category.as_str()])
            .inc();
    }

    pub fn inc_unit_failures(&self, kind: Option<HeuristicKind>) {
        let label = kind.map(|k| k.as_str()).unwrap_or("none");
        self.inner().unit_failures_total.with_label_values(&[label]).inc();
    }

    pub fn inc_provider_call(&self, operation: Operation, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.inner()
            .provider_calls_total
            .with_label_values(&[operation.as_str(), outcome])
            .inc();
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for engine events
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_run_started(&self, kind: HeuristicKind, profiles: usize) {
        info!(
            event = "run_started",
            component = %self.component,
            heuristic = %kind.as_str(),
            profiles = profiles,
            "Starting heuristic run"
        );
    }

    pub fn log_run_finished(
        &self,
        kind: HeuristicKind,
        recommendations: usize,
        failures: usize,
        duration_secs: f64,
    ) {
        if failures == 0 {
            info!(
                event = "run_finished",
                component = %self.component,
                heuristic = %kind.as_str(),
                recommendations = recommendations,
                duration_secs = duration_secs,
                "Heuristic run complete"
            );
        } else {
            warn!(
                event = "run_finished",
                component = %self.component,
                heuristic = %kind.as_str(),
                recommendations = recommendations,
                failures = failures,
                duration_secs = duration_secs,
                "Heuristic run completed with failed units"
            );
        }
    }

    pub fn log_unit_failure(&self, failure: &UnitFailure) {
        warn!(
            event = "unit_failed",
            component = %self.component,
            heuristic = failure.heuristic.map(|k| k.as_str()).unwrap_or(""),
            profile_id = failure.profile_id.as_deref().unwrap_or(""),
            compartment_id = failure.compartment_id.as_deref().unwrap_or(""),
            resource_id = failure.resource_id.as_deref().unwrap_or(""),
            error = %failure.message,
            "Unit of work failed"
        );
    }

    pub fn log_recommendation(&self, rec: &Recommendation) {
        debug!(
            event = "recommendation",
            component = %self.component,
            category = %rec.category,
            resource_id = %rec.resource_id,
            compartment_id = %rec.compartment_id,
            name = %rec.name,
            "Produced recommendation"
        );
    }

    pub fn log_profile_resolved(&self, profile_id: &str, compartments: usize) {
        info!(
            event = "profile_resolved",
            component = %self.component,
            profile_id = %profile_id,
            compartments = compartments,
            "Resolved profile scope"
        );
    }
}
