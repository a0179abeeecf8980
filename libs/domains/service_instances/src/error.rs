use uuid::Uuid;

pub type ServiceInstanceResult<T> = Result<T, ServiceInstanceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceInstanceError {
    #[error("service instance not found: {0}")]
    NotFound(Uuid),

    #[error("provisioning failed: {0}")]
    ProvisioningFailure(String),

    #[error("ports exhausted")]
    PortsExhausted,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<domain_ports::PortError> for ServiceInstanceError {
    fn from(e: domain_ports::PortError) -> Self {
        match e {
            domain_ports::PortError::ExhaustedRange => Self::PortsExhausted,
            domain_ports::PortError::NotFound(id) => Self::NotFound(id),
            domain_ports::PortError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<container_runtime::RuntimeError> for ServiceInstanceError {
    fn from(e: container_runtime::RuntimeError) -> Self {
        Self::ProvisioningFailure(e.to_string())
    }
}

impl From<object_store_adapter::ObjectStoreError> for ServiceInstanceError {
    fn from(e: object_store_adapter::ObjectStoreError) -> Self {
        Self::ProvisioningFailure(e.to_string())
    }
}
