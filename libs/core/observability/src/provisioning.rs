//! Provisioning and lifecycle metrics for the environment control plane.

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Provisioning/lifecycle metrics recorder
pub struct ProvisioningMetrics;

impl ProvisioningMetrics {
    // =========================================================================
    // Environment lifecycle
    // =========================================================================

    /// Record an environment lifecycle state-machine transition.
    pub fn record_environment_transition(from: &str, to: &str) {
        counter!(
            "mockfactory_environment_transitions_total",
            "from" => from.to_string(),
            "to" => to.to_string()
        )
        .increment(1);

        tracing::info!(from = from, to = to, "Environment transitioned");
    }

    /// Record the outcome of a provisioning attempt.
    pub fn record_provisioning_completed(service_kind: &str, duration_secs: f64) {
        counter!(
            "mockfactory_provisioning_operations_total",
            "service_kind" => service_kind.to_string(),
            "status" => "completed"
        )
        .increment(1);

        histogram!(
            "mockfactory_provisioning_duration_seconds",
            "service_kind" => service_kind.to_string()
        )
        .record(duration_secs);
    }

    /// Record a provisioning failure.
    pub fn record_provisioning_failed(service_kind: &str, reason: &str) {
        counter!(
            "mockfactory_provisioning_operations_total",
            "service_kind" => service_kind.to_string(),
            "status" => "failed"
        )
        .increment(1);

        tracing::warn!(service_kind = service_kind, reason = reason, "Provisioning failed");
    }

    /// Set the number of environments currently in a given status.
    pub fn set_environments_in_status(status: &str, count: usize) {
        gauge!("mockfactory_environments_in_status", "status" => status.to_string())
            .set(count as f64);
    }

    // =========================================================================
    // Port allocation
    // =========================================================================

    /// Set how many ports out of the configured range are currently leased.
    pub fn set_port_pool_used(count: usize) {
        gauge!("mockfactory_port_pool_used").set(count as f64);
    }

    /// Record a port lease or release.
    pub fn record_port_event(event: &str) {
        counter!("mockfactory_port_events_total", "event" => event.to_string()).increment(1);
    }

    // =========================================================================
    // Usage metering
    // =========================================================================

    /// Record a usage interval closing, with its accrued duration.
    pub fn record_usage_interval_closed(service_kind: &str, duration_secs: f64) {
        histogram!(
            "mockfactory_usage_interval_seconds",
            "service_kind" => service_kind.to_string()
        )
        .record(duration_secs);
    }

    // =========================================================================
    // DNS
    // =========================================================================

    /// Record a UDP DNS query handled by the responder.
    pub fn record_dns_query(record_type: &str, outcome: &str) {
        counter!(
            "mockfactory_dns_queries_total",
            "record_type" => record_type.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }

    // =========================================================================
    // Cloud emulation
    // =========================================================================

    /// Record an emulated cloud API call.
    pub fn record_emulation_call(family: &str, operation: &str, outcome: &str) {
        counter!(
            "mockfactory_emulation_calls_total",
            "family" => family.to_string(),
            "operation" => operation.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
    }
}

/// Timer guard for recording a provisioning operation's duration.
///
/// Records on `stop()` or on drop, whichever happens first.
pub struct ProvisioningTimer {
    start: Instant,
    service_kind: String,
    stopped: bool,
}

impl ProvisioningTimer {
    pub fn new(service_kind: &str) -> Self {
        Self {
            start: Instant::now(),
            service_kind: service_kind.to_string(),
            stopped: false,
        }
    }

    /// Stop the timer and record the duration. Returns duration in milliseconds.
    pub fn stop(&mut self) -> u64 {
        if self.stopped {
            return 0;
        }
        self.stopped = true;

        let duration = self.start.elapsed();
        histogram!(
            "mockfactory_provisioning_duration_seconds",
            "service_kind" => self.service_kind.clone()
        )
        .record(duration.as_secs_f64());

        duration.as_millis() as u64
    }
}

impl Drop for ProvisioningTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}
