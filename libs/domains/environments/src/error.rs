use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

pub type EnvironmentResult<T> = Result<T, EnvironmentError>;

#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    #[error("environment not found: {0}")]
    NotFound(Uuid),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid state transition: {0}")]
    Conflict(String),

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("provisioning failed: {0}")]
    ProvisioningFailure(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for EnvironmentError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                format!("environment {id} not found"),
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg.clone()),
            Self::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, "TooManyRequests", msg.clone()),
            Self::ProvisioningFailure(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ProvisioningFailure",
                msg.clone(),
            ),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "InvalidRequest", msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg.clone()),
        };

        let body = Json(json!({
            "error": { "type": kind, "message": message }
        }));

        (status, body).into_response()
    }
}
