use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use uuid::Uuid;

pub type DnsResult<T> = Result<T, DnsError>;

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("dns record not found: {0}")]
    NotFound(Uuid),

    #[error("caller does not own environment {0}")]
    Forbidden(Uuid),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for DnsError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::NotFound(id) => (StatusCode::NOT_FOUND, "NotFound", format!("dns record {id} not found")),
            Self::Forbidden(id) => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                format!("caller does not own environment {id}"),
            ),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "InvalidRequest", msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg.clone()),
        };

        let body = Json(json!({ "error": { "type": kind, "message": message } }));
        (status, body).into_response()
    }
}
