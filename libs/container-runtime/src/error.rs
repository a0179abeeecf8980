use thiserror::Error;

/// Raw failure kinds surfaced by a runtime adapter. The adapter performs no
/// retries and no interpretation; callers (the Service Provisioner) decide
/// what a given kind means for provisioning policy.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("failed to create container: {0}")]
    CreateFailed(String),

    #[error("failed to start container: {0}")]
    StartFailed(String),

    #[error("failed to stop container: {0}")]
    StopFailed(String),

    #[error("failed to remove container: {0}")]
    RemoveFailed(String),

    #[error("failed to inspect container: {0}")]
    InspectFailed(String),

    #[error("exec failed: {0}")]
    ExecFailed(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
