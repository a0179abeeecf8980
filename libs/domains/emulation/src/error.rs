use uuid::Uuid;

pub type EmulationResult<T> = Result<T, EmulationError>;

/// Translator-internal error kinds. Each family module owns encoding
/// these into its cloud's conventional envelope (XML `<Error>` for S3,
/// `__type` JSON for DynamoDB, and so on); nothing here renders to a
/// response directly.
#[derive(Debug, thiserror::Error)]
pub enum EmulationError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("caller does not own environment {0}")]
    Forbidden(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("operation not implemented: {0}")]
    NotImplemented(String),

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EmulationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<domain_environments::EnvironmentError> for EmulationError {
    fn from(e: domain_environments::EnvironmentError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<domain_service_instances::ServiceInstanceError> for EmulationError {
    fn from(e: domain_service_instances::ServiceInstanceError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<object_store_adapter::ObjectStoreError> for EmulationError {
    fn from(e: object_store_adapter::ObjectStoreError) -> Self {
        match e {
            object_store_adapter::ObjectStoreError::ObjectNotFound(_, key) => Self::NotFound(format!("object {key}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<container_runtime::RuntimeError> for EmulationError {
    fn from(e: container_runtime::RuntimeError) -> Self {
        Self::Internal(e.to_string())
    }
}
