use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use container_runtime::ContainerRuntime;
use domain_environments::{EffectResult, ResourceCleanup};
use uuid::Uuid;

use crate::repository::EmulatedResourceRepository;

/// Destroy-time sweep for emulated resources: stops and removes any
/// containers the Lambda translator created, then deletes every row the
/// environment owns. Registered with the Lifecycle Manager alongside the
/// DNS cleanup.
pub struct EmulationCleanup {
    resources: Arc<dyn EmulatedResourceRepository>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl EmulationCleanup {
    pub fn new(resources: Arc<dyn EmulatedResourceRepository>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { resources, runtime }
    }
}

#[async_trait]
impl ResourceCleanup for EmulationCleanup {
    async fn purge(&self, environment_id: Uuid) -> EffectResult<()> {
        let rows = self
            .resources
            .list_for_environment(environment_id)
            .await
            .map_err(|e| domain_environments::EffectError::Internal(e.to_string()))?;

        for row in rows.iter().filter(|r| r.container_id.is_some()) {
            let container_id = row.container_id.as_deref().expect("filtered on container_id");
            // Best-effort, matching the provisioner's teardown: a container
            // that is already gone must not wedge environment destruction.
            let _ = self.runtime.stop(container_id, Duration::from_secs(5)).await;
            let _ = self.runtime.remove(container_id, true).await;
        }

        self.resources
            .delete_for_environment(environment_id)
            .await
            .map_err(|e| domain_environments::EffectError::Internal(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmulatedResource, ResourceFamily};
    use crate::testing::{harness, ScriptedRuntime};

    #[tokio::test]
    async fn purge_drops_every_row_for_the_environment() {
        let h = harness().await;

        let mut function =
            EmulatedResource::new(h.environment_id, ResourceFamily::Lambda, "function", "env/cleanup-fn");
        function.container_id = Some("container-x".to_string());
        h.resources.create(function).await.unwrap();
        h.resources
            .create(EmulatedResource::new(h.environment_id, ResourceFamily::S3, "bucket", "cleanup-bucket"))
            .await
            .unwrap();

        let cleanup = EmulationCleanup::new(h.resources.clone(), Arc::new(ScriptedRuntime::default()));
        cleanup.purge(h.environment_id).await.unwrap();

        assert!(h.resources.list_for_environment(h.environment_id).await.unwrap().is_empty());
    }
}
