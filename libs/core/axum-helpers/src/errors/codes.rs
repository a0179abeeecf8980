//! Error codes for the control plane's API surface.
//!
//! One identifier per failure family the environment-lifecycle endpoints
//! can produce, shared by every domain crate so clients see a single
//! vocabulary whether a request died in validation, provisioning, or the
//! database. Each code carries:
//! - a SCREAMING_SNAKE_CASE string for client dispatch (`"PORTS_EXHAUSTED"`)
//! - a numeric code for logs and metrics (`2102`)
//! - the HTTP status the family conventionally maps to
//! - a default message for when a handler has nothing more specific
//!
//! # Example
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ProvisioningFailed;
//! assert_eq!(code.as_str(), "PROVISIONING_FAILED");
//! assert_eq!(code.code(), 2101);
//! ```

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Failure families of the control plane.
///
/// Numeric ranges group the families:
/// - 1000s: request shape (malformed JSON, validation, bad identifiers)
/// - 2000s: lifecycle and provisioning outcomes
/// - 3000s: ownership, quotas, and account standing
/// - 5000s: infrastructure (database, container runtime, object store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body failed `validator` checks
    ValidationError,

    /// Path or query parameter is not a valid UUID
    InvalidUuid,

    /// Request body is not the JSON shape the endpoint expects
    InvalidJson,

    /// Addressed entity (environment, record, user) does not exist —
    /// also the answer when the caller does not own it
    NotFound,

    /// No caller identity bound to the request
    Unauthorized,

    /// Caller is known but not allowed (disabled account, foreign
    /// environment on the emulation surface)
    Forbidden,

    /// State-machine or uniqueness violation: stopping a non-running
    /// environment, a taken hostname, a duplicate DNS record
    Conflict,

    /// A declared service could not be brought to RUNNING; the
    /// environment is left in its error state with everything rolled back
    ProvisioningFailed,

    /// No free port remained in the managed range
    PortsExhausted,

    /// A bounded external call (container runtime, object store,
    /// readiness probe) outlived its deadline
    Timeout,

    /// Tier cap reached: concurrent running environments or creations
    /// per day
    QuotaExceeded,

    /// Relational store failure the domain layer could not classify
    DatabaseError,

    /// Dependency (runtime socket, object store) is temporarily down
    ServiceUnavailable,

    /// Anything unclassified
    InternalError,
}

impl ErrorCode {
    /// String identifier clients dispatch on.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::InvalidJson => "INVALID_JSON",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::ProvisioningFailed => "PROVISIONING_FAILED",
            Self::PortsExhausted => "PORTS_EXHAUSTED",
            Self::Timeout => "TIMEOUT",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Numeric code for structured logs and metrics.
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::InvalidJson => 1003,

            Self::NotFound => 2001,
            Self::Conflict => 2002,
            Self::ProvisioningFailed => 2101,
            Self::PortsExhausted => 2102,
            Self::Timeout => 2103,

            Self::Unauthorized => 3001,
            Self::Forbidden => 3002,
            Self::QuotaExceeded => 3003,

            Self::DatabaseError => 5001,
            Self::ServiceUnavailable => 5002,
            Self::InternalError => 5099,
        }
    }

    /// The HTTP status this family conventionally maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError | Self::InvalidUuid | Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            // a lost port race is a uniqueness conflict, not throttling
            Self::Conflict | Self::PortsExhausted => StatusCode::CONFLICT,
            Self::ProvisioningFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Default user-facing message when a handler adds nothing specific.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidUuid => "Invalid UUID format",
            Self::InvalidJson => "Request body is not valid JSON",
            Self::NotFound => "Resource not found",
            Self::Unauthorized => "Caller identity is missing",
            Self::Forbidden => "Caller may not access this resource",
            Self::Conflict => "Request conflicts with current state",
            Self::ProvisioningFailed => "Environment provisioning failed",
            Self::PortsExhausted => "No free port in the managed range",
            Self::Timeout => "External call exceeded its deadline",
            Self::QuotaExceeded => "Tier quota exceeded",
            Self::DatabaseError => "Database error occurred",
            Self::ServiceUnavailable => "A backing service is unavailable",
            Self::InternalError => "An internal error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_match_client_vocabulary() {
        assert_eq!(ErrorCode::ProvisioningFailed.as_str(), "PROVISIONING_FAILED");
        assert_eq!(ErrorCode::PortsExhausted.as_str(), "PORTS_EXHAUSTED");
        assert_eq!(ErrorCode::QuotaExceeded.to_string(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn ports_exhausted_is_a_conflict_not_throttling() {
        assert_eq!(ErrorCode::PortsExhausted.status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::QuotaExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::ProvisioningFailed).unwrap();
        assert_eq!(json, "\"PROVISIONING_FAILED\"");
        let code: ErrorCode = serde_json::from_str("\"PORTS_EXHAUSTED\"").unwrap();
        assert_eq!(code, ErrorCode::PortsExhausted);
    }
}
