//! Observability utilities for the MockFactory control plane.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Custom metrics for environment lifecycle, provisioning, ports, usage,
//!   DNS and cloud-API emulation
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, ProvisioningMetrics};
//!
//! // Initialize metrics recorder
//! init_metrics();
//!
//! // Record a lifecycle transition
//! ProvisioningMetrics::record_environment_transition("PROVISIONING", "RUNNING");
//!
//! // Add metrics endpoint to router
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler));
//! ```

pub mod middleware;
pub mod provisioning;

pub use provisioning::ProvisioningMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup.
/// Returns the PrometheusHandle for rendering metrics.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        info!("Prometheus metrics recorder initialized");

        // Register metric descriptions
        register_metric_descriptions();

        handle
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Environment lifecycle metrics
    describe_counter!(
        "mockfactory_environment_transitions_total",
        "Environment lifecycle transitions by from/to state"
    );
    describe_gauge!(
        "mockfactory_environments_in_status",
        "Current number of environments in a given status"
    );

    // Provisioning metrics
    describe_counter!(
        "mockfactory_provisioning_operations_total",
        "Total provisioning operations by service kind and status"
    );
    describe_histogram!(
        "mockfactory_provisioning_duration_seconds",
        "Provisioning operation duration in seconds"
    );

    // Port allocation metrics
    describe_gauge!(
        "mockfactory_port_pool_used",
        "Ports currently leased out of the configured range"
    );
    describe_counter!(
        "mockfactory_port_events_total",
        "Port lease/release events"
    );

    // Usage metering
    describe_histogram!(
        "mockfactory_usage_interval_seconds",
        "Closed usage interval durations by service kind"
    );

    // DNS
    describe_counter!(
        "mockfactory_dns_queries_total",
        "UDP DNS queries handled by record type and outcome"
    );

    // Cloud-API emulation
    describe_counter!(
        "mockfactory_emulation_calls_total",
        "Emulated cloud API calls by family, operation and outcome"
    );
}
