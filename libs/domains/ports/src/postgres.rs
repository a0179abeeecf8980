use async_trait::async_trait;
use database::BaseRepository;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, SqlErr};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    entity,
    error::{PortError, PortResult},
    models::{PortAllocation, PORT_RANGE_END, PORT_RANGE_START},
    repository::PortRepository,
};

const MAX_ALLOCATE_ATTEMPTS: usize = 8;

pub struct PgPortRepository {
    base: BaseRepository<entity::Entity>,
}

impl PgPortRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn active_ports(&self) -> PortResult<HashSet<i32>> {
        let ports: Vec<i32> = entity::Entity::find()
            .filter(entity::Column::Active.eq(true))
            .select_only()
            .column(entity::Column::Port)
            .into_tuple()
            .all(self.base.db())
            .await
            .map_err(|e| PortError::Internal(format!("Database error: {}", e)))?;

        Ok(ports.into_iter().collect())
    }
}

#[async_trait]
impl PortRepository for PgPortRepository {
    async fn allocate(&self, service_instance_id: Uuid) -> PortResult<PortAllocation> {
        for _ in 0..MAX_ALLOCATE_ATTEMPTS {
            let active = self.active_ports().await?;
            let candidate = (PORT_RANGE_START..=PORT_RANGE_END)
                .find(|port| !active.contains(&(*port as i32)));

            let Some(port) = candidate else {
                return Err(PortError::ExhaustedRange);
            };

            let allocation = PortAllocation::new(service_instance_id, port);
            let active_model: entity::ActiveModel = allocation.into();

            match self.base.insert(active_model).await {
                Ok(model) => return Ok(model.into()),
                Err(e) if e.sql_err().map(|s| matches!(s, SqlErr::UniqueConstraintViolation(_))) == Some(true) => {
                    continue; // lost the race for this port, retry with a fresh scan
                }
                Err(e) => return Err(PortError::Internal(format!("Database error: {}", e))),
            }
        }

        Err(PortError::ExhaustedRange)
    }

    async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PortAllocation>> {
        let model = self
            .base
            .find_by_id(id)
            .await
            .map_err(|e| PortError::Internal(format!("Database error: {}", e)))?;

        Ok(model.map(Into::into))
    }

    async fn get_active_for_service_instance(
        &self,
        service_instance_id: Uuid,
    ) -> PortResult<Option<PortAllocation>> {
        let model = entity::Entity::find()
            .filter(entity::Column::ServiceInstanceId.eq(service_instance_id))
            .filter(entity::Column::Active.eq(true))
            .one(self.base.db())
            .await
            .map_err(|e| PortError::Internal(format!("Database error: {}", e)))?;

        Ok(model.map(Into::into))
    }

    async fn release(&self, id: Uuid) -> PortResult<PortAllocation> {
        let model = self
            .base
            .find_by_id(id)
            .await
            .map_err(|e| PortError::Internal(format!("Database error: {}", e)))?
            .ok_or(PortError::NotFound(id))?;

        let mut allocation: PortAllocation = model.into();
        allocation.release();

        let active_model: entity::ActiveModel = allocation.into();
        let updated = self
            .base
            .update(active_model)
            .await
            .map_err(|e| PortError::Internal(format!("Database error: {}", e)))?;

        Ok(updated.into())
    }

    async fn release_for_service_instance(&self, service_instance_id: Uuid) -> PortResult<()> {
        if let Some(allocation) = self
            .get_active_for_service_instance(service_instance_id)
            .await?
        {
            self.release(allocation.id).await?;
        }
        Ok(())
    }

    async fn list_active(&self) -> PortResult<Vec<PortAllocation>> {
        let models = entity::Entity::find()
            .filter(entity::Column::Active.eq(true))
            .all(self.base.db())
            .await
            .map_err(|e| PortError::Internal(format!("Database error: {}", e)))?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
