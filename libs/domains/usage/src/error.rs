use uuid::Uuid;

pub type UsageResult<T> = Result<T, UsageError>;

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("no open usage interval for environment {0}")]
    NoOpenInterval(Uuid),

    #[error("usage interval not found: {0}")]
    NotFound(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}
