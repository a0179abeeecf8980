use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{error::ServiceInstanceResult, models::ServiceInstance};

#[async_trait]
pub trait ServiceInstanceRepository: Send + Sync {
    async fn create(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance>;

    async fn get_by_id(&self, id: Uuid) -> ServiceInstanceResult<Option<ServiceInstance>>;

    async fn list_for_environment(&self, environment_id: Uuid) -> ServiceInstanceResult<Vec<ServiceInstance>>;

    async fn update(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance>;

    /// Every ServiceInstance not yet DESTROYED whose container may need GC
    /// reconciliation (the port GC loop consults this indirectly via ports).
    async fn list_active(&self) -> ServiceInstanceResult<Vec<ServiceInstance>>;
}

#[async_trait]
impl<T: ServiceInstanceRepository + ?Sized> ServiceInstanceRepository for Arc<T> {
    async fn create(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance> {
        (**self).create(instance).await
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceInstanceResult<Option<ServiceInstance>> {
        (**self).get_by_id(id).await
    }

    async fn list_for_environment(&self, environment_id: Uuid) -> ServiceInstanceResult<Vec<ServiceInstance>> {
        (**self).list_for_environment(environment_id).await
    }

    async fn update(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance> {
        (**self).update(instance).await
    }

    async fn list_active(&self) -> ServiceInstanceResult<Vec<ServiceInstance>> {
        (**self).list_active().await
    }
}
