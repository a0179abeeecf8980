use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::PortResult, models::PortAllocation};

/// Persistence for PortAllocation rows. `allocate` is the only method that
/// must hold the uniqueness invariant under concurrent callers; the
/// Postgres implementation leans on a partial unique index rather than an
/// application-level lock.
#[async_trait]
pub trait PortRepository: Send + Sync {
    /// Reserve the first free port in range, retrying past collisions.
    async fn allocate(&self, service_instance_id: Uuid) -> PortResult<PortAllocation>;

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PortAllocation>>;

    async fn get_active_for_service_instance(
        &self,
        service_instance_id: Uuid,
    ) -> PortResult<Option<PortAllocation>>;

    async fn release(&self, id: Uuid) -> PortResult<PortAllocation>;

    async fn release_for_service_instance(&self, service_instance_id: Uuid) -> PortResult<()>;

    async fn list_active(&self) -> PortResult<Vec<PortAllocation>>;
}
