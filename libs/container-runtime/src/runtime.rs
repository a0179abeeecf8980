use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::RuntimeResult,
    models::{ContainerInspection, ContainerSpec, ExecOutput},
};

/// Capability-restricted container lifecycle adapter. Implementations must
/// not accept volume mounts, swarm operations, or exec targeting anything
/// other than the container's own PID namespace.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn create(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    async fn start(&self, container_id: &str) -> RuntimeResult<()>;

    async fn stop(&self, container_id: &str, grace: std::time::Duration) -> RuntimeResult<()>;

    async fn remove(&self, container_id: &str, force: bool) -> RuntimeResult<()>;

    async fn inspect(&self, container_id: &str) -> RuntimeResult<ContainerInspection>;

    /// Runs `argv` inside the container and waits for completion. Used by
    /// Lambda emulation to invoke a handler per request.
    async fn exec(&self, container_id: &str, argv: &[String]) -> RuntimeResult<ExecOutput>;
}

#[async_trait]
impl<T: ContainerRuntime + ?Sized> ContainerRuntime for Arc<T> {
    async fn create(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        (**self).create(spec).await
    }

    async fn start(&self, container_id: &str) -> RuntimeResult<()> {
        (**self).start(container_id).await
    }

    async fn stop(&self, container_id: &str, grace: std::time::Duration) -> RuntimeResult<()> {
        (**self).stop(container_id, grace).await
    }

    async fn remove(&self, container_id: &str, force: bool) -> RuntimeResult<()> {
        (**self).remove(container_id, force).await
    }

    async fn inspect(&self, container_id: &str) -> RuntimeResult<ContainerInspection> {
        (**self).inspect(container_id).await
    }

    async fn exec(&self, container_id: &str, argv: &[String]) -> RuntimeResult<ExecOutput> {
        (**self).exec(container_id, argv).await
    }
}
