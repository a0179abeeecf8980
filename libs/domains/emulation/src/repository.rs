use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::{
    error::EmulationResult,
    models::{EmulatedResource, ResourceFamily},
};

#[async_trait]
pub trait EmulatedResourceRepository: Send + Sync {
    async fn create(&self, resource: EmulatedResource) -> EmulationResult<EmulatedResource>;

    async fn update(&self, resource: EmulatedResource) -> EmulationResult<EmulatedResource>;

    /// Lookup by the cloud-facing id. `(family, external_id)` is unique
    /// across all environments, which is what makes bucket names global.
    async fn get(&self, family: ResourceFamily, external_id: &str) -> EmulationResult<Option<EmulatedResource>>;

    async fn list(
        &self,
        environment_id: Uuid,
        family: ResourceFamily,
        kind: &str,
    ) -> EmulationResult<Vec<EmulatedResource>>;

    /// Every row of every family for an environment, for destroy-time
    /// cleanup.
    async fn list_for_environment(&self, environment_id: Uuid) -> EmulationResult<Vec<EmulatedResource>>;

    async fn delete(&self, id: Uuid) -> EmulationResult<()>;

    /// Cleanup path for environment destruction; the environments row is
    /// never deleted so the cascade foreign key never fires.
    async fn delete_for_environment(&self, environment_id: Uuid) -> EmulationResult<()>;

    /// SQS ReceiveMessage semantics: atomically selects up to `max`
    /// message rows of `queue_url` whose `visible_at` has passed, pushes
    /// `visible_at` forward by `visibility`, stamps a fresh receipt
    /// handle on each, and returns the claimed rows. Two concurrent
    /// receivers never claim the same message within its visibility
    /// window.
    async fn claim_queue_messages(
        &self,
        environment_id: Uuid,
        queue_url: &str,
        max: usize,
        visibility: Duration,
    ) -> EmulationResult<Vec<EmulatedResource>>;
}
