use thiserror::Error;
use uuid::Uuid;

pub type PortResult<T> = Result<T, PortError>;

/// Port allocation has no HTTP surface of its own: every failure reaches
/// a caller through the Service Provisioner, which folds `ExhaustedRange`
/// into its provisioning-failure handling. No response mapping here.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Port allocation not found: {0}")]
    NotFound(Uuid),

    #[error("No ports available in range")]
    ExhaustedRange,

    #[error("Internal error: {0}")]
    Internal(String),
}
