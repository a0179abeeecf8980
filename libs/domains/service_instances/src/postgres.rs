use async_trait::async_trait;
use database::BaseRepository;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity,
    error::{ServiceInstanceError, ServiceInstanceResult},
    models::{ServiceInstance, ServiceInstanceStatus},
    repository::ServiceInstanceRepository,
};

pub struct PgServiceInstanceRepository {
    base: BaseRepository<entity::Entity>,
}

impl PgServiceInstanceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ServiceInstanceRepository for PgServiceInstanceRepository {
    async fn create(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance> {
        let active_model: entity::ActiveModel = instance.into();
        let model = self
            .base
            .insert(active_model)
            .await
            .map_err(|e| ServiceInstanceError::Internal(format!("database error: {e}")))?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceInstanceResult<Option<ServiceInstance>> {
        let model = self
            .base
            .find_by_id(id)
            .await
            .map_err(|e| ServiceInstanceError::Internal(format!("database error: {e}")))?;
        Ok(model.map(Into::into))
    }

    async fn list_for_environment(&self, environment_id: Uuid) -> ServiceInstanceResult<Vec<ServiceInstance>> {
        let models = entity::Entity::find()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .all(self.base.db())
            .await
            .map_err(|e| ServiceInstanceError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, instance: ServiceInstance) -> ServiceInstanceResult<ServiceInstance> {
        let active_model: entity::ActiveModel = instance.into();
        let model = self
            .base
            .update(active_model)
            .await
            .map_err(|e| ServiceInstanceError::Internal(format!("database error: {e}")))?;
        Ok(model.into())
    }

    async fn list_active(&self) -> ServiceInstanceResult<Vec<ServiceInstance>> {
        let models = entity::Entity::find()
            .filter(entity::Column::Status.ne(ServiceInstanceStatus::Destroyed.to_string()))
            .all(self.base.db())
            .await
            .map_err(|e| ServiceInstanceError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
