use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("object not found: {0}/{1}")]
    ObjectNotFound(String, String),

    #[error("failed to create namespace: {0}")]
    CreateNamespaceFailed(String),

    #[error("failed to delete namespace: {0}")]
    DeleteNamespaceFailed(String),

    #[error("put object failed: {0}")]
    PutFailed(String),

    #[error("get object failed: {0}")]
    GetFailed(String),

    #[error("list objects failed: {0}")]
    ListFailed(String),

    #[error("delete object failed: {0}")]
    DeleteFailed(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;
