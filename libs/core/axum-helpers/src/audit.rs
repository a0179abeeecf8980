//! Audit logging for resource mutations.
//!
//! Every mutation a caller can bill or be billed for — environment
//! creation, hostname changes, DNS writes — emits one structured event
//! to the `audit` tracing target, so a log backend can route the trail
//! separately from application logs.
//!
//! # Example
//! ```ignore
//! use axum_helpers::audit::{AuditEvent, AuditOutcome};
//!
//! AuditEvent::new(
//!     Some(caller.user_id.to_string()),
//!     "environment.create",
//!     Some(format!("environment:{id}")),
//!     AuditOutcome::Success,
//! )
//! .log();
//!
//! AuditEvent::new(
//!     Some(caller.user_id.to_string()),
//!     "environment.destroy",
//!     Some(format!("environment:{id}")),
//!     AuditOutcome::Denied,
//! )
//! .with_details(json!({"reason": "not the owner"}))
//! .log();
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of an audited action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Action completed
    Success,
    /// Action failed (validation, provisioning, or system error)
    Failure,
    /// Action was refused (ownership, quota, disabled account)
    Denied,
}

/// One structured audit event.
///
/// Build with `new`, attach optional context with the `with_*` methods,
/// then `log()` to emit.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Caller who performed the action, if the request carried an identity
    pub user_id: Option<String>,
    /// Action identifier, `<entity>.<verb>` ("environment.create",
    /// "dns_record.create", "environment.update_hostname")
    pub action: String,
    /// Affected resource, `<entity>:<id>` ("environment:0199b2f0-…")
    pub resource: Option<String>,
    /// What happened
    pub outcome: AuditOutcome,
    /// When it happened
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Free-form context (JSON)
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        user_id: Option<String>,
        action: impl Into<String>,
        resource: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            resource,
            outcome,
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Attach structured context, e.g. the refusal reason.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Emit the event to the `audit` target with structured fields plus
    /// the full JSON form as the message, so both field-indexing and
    /// line-shipping backends get a usable record.
    pub fn log(self) {
        tracing::info!(
            target: "audit",
            user_id = self.user_id,
            action = %self.action,
            resource = self.resource,
            outcome = ?self.outcome,
            timestamp = %self.timestamp,
            details = ?self.details,
            "{}",
            serde_json::to_string(&self).unwrap_or_else(|_| "failed to serialize audit event".to_string())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_lowercase_outcome() {
        let event = AuditEvent::new(
            Some("7f9c0d4e".to_string()),
            "environment.create",
            Some("environment:abc".to_string()),
            AuditOutcome::Success,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"outcome\":\"success\""));
        assert!(json.contains("\"action\":\"environment.create\""));
    }

    #[test]
    fn details_attach_as_json() {
        let event = AuditEvent::new(None, "environment.destroy", None, AuditOutcome::Denied)
            .with_details(serde_json::json!({"reason": "not the owner"}));
        assert_eq!(event.details.unwrap()["reason"], "not the owner");
    }
}
