pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Error as UuidError;
use validator::ValidationErrors;

/// Envelope every error response uses, whichever domain produced it.
///
/// - `code`: numeric code for logs and monitoring (e.g. `2102`)
/// - `error`: machine-readable identifier (e.g. `"PORTS_EXHAUSTED"`)
/// - `message`: human-readable description
/// - `details`: optional structure, e.g. per-field validation errors
///
/// # JSON Example
///
/// ```json
/// {
///   "code": 2002,
///   "error": "CONFLICT",
///   "message": "hostname api.demo.mockfactory.dev is already in use",
///   "details": null
/// }
/// ```
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Numeric code for logging and monitoring
    pub code: i32,
    /// Machine-readable identifier for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured details (e.g. validation field errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Envelope for a code with a handler-supplied message.
    pub fn of(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            error: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Catch-all error for plumbing that sits outside a domain crate (the
/// shared extractors, infallible-looking glue in the binary). Domain
/// crates define their own error enums; this one only covers what the
/// helpers themselves can fail with, mapped onto the same `ErrorCode`
/// vocabulary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonRejection(#[from] JsonRejection),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid UUID: {0}")]
    Uuid(#[from] UuidError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::JsonRejection(_) => ErrorCode::InvalidJson,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Uuid(_) => ErrorCode::InvalidUuid,
            Self::Database(DbErr::RecordNotFound(_)) => ErrorCode::NotFound,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();

        let (message, details) = match &self {
            AppError::JsonRejection(e) => (e.body_text(), None),
            AppError::Validation(e) => (
                code.default_message().to_string(),
                Some(serde_json::to_value(e).unwrap_or(serde_json::Value::Null)),
            ),
            // database internals stay in the logs, not in the response body
            AppError::Database(e) if code == ErrorCode::DatabaseError => {
                tracing::error!(error_code = code.code(), error = %e, "database error");
                (code.default_message().to_string(), None)
            }
            other => (other.to_string(), None),
        };

        if code.status().is_server_error() {
            tracing::error!(error_code = code.code(), %message, "request failed");
        } else {
            tracing::info!(error_code = code.code(), %message, "request rejected");
        }

        let body = Json(ErrorResponse {
            details,
            ..ErrorResponse::of(code, message)
        });
        (code.status(), body).into_response()
    }
}

/// Builds an error response outside a domain error enum, e.g. from a
/// middleware or fallback.
///
/// # Example
///
/// ```rust,ignore
/// use axum_helpers::errors::{error_response, ErrorCode};
///
/// let response = error_response(ErrorCode::QuotaExceeded, "tier free allows 1 running environment");
/// ```
pub fn error_response(code: ErrorCode, message: impl Into<String>) -> Response {
    (code.status(), Json(ErrorResponse::of(code, message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_maps_to_not_found() {
        let error = AppError::Database(DbErr::RecordNotFound("environments".into()));
        assert_eq!(error.error_code(), ErrorCode::NotFound);
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let error = AppError::Database(DbErr::Custom("connection reset".into()));
        assert_eq!(error.error_code(), ErrorCode::DatabaseError);
        assert_eq!(error.error_code().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn envelope_carries_code_and_identifier() {
        let envelope = ErrorResponse::of(ErrorCode::Conflict, "hostname already in use");
        assert_eq!(envelope.code, 2002);
        assert_eq!(envelope.error, "CONFLICT");
    }
}
