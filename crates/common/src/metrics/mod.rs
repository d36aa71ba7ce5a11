//! Metrics and observability utilities
//!
//! Prometheus-style counters for the session layer and HTTP requests,
//! recorded through the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Contactdesk metrics
pub const METRICS_PREFIX: &str = "contactdesk";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Session metrics
    describe_counter!(
        format!("{}_session_events_total", METRICS_PREFIX),
        Unit::Count,
        "Session lifecycle events (created, updated, extended, deleted)"
    );

    describe_counter!(
        format!("{}_auth_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Requests rejected by the authorization gate"
    );

    describe_counter!(
        format!("{}_session_store_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Failed calls to the session key-value store"
    );

    // Contact metrics
    describe_counter!(
        format!("{}_contacts_created_total", METRICS_PREFIX),
        Unit::Count,
        "Contact form submissions stored"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Count a session lifecycle event
pub fn record_session_event(event: &'static str) {
    counter!(
        format!("{}_session_events_total", METRICS_PREFIX),
        "event" => event
    )
    .increment(1);
}

/// Count a gate rejection. The reason label is for operators only.
pub fn record_auth_failure(reason: &'static str) {
    counter!(
        format!("{}_auth_failures_total", METRICS_PREFIX),
        "reason" => reason
    )
    .increment(1);
}

/// Count a failed key-value store call
pub fn record_store_error(operation: &'static str) {
    counter!(
        format!("{}_session_store_errors_total", METRICS_PREFIX),
        "operation" => operation
    )
    .increment(1);
}

/// Count a stored contact submission
pub fn record_contact_created() {
    counter!(format!("{}_contacts_created_total", METRICS_PREFIX)).increment(1);
}
