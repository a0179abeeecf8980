use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::BaseRepository;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait};
use uuid::Uuid;

use crate::{
    entity,
    error::{EnvironmentError, EnvironmentResult},
    models::{Environment, EnvironmentFilter, EnvironmentStatus},
    repository::EnvironmentRepository,
};

pub struct PgEnvironmentRepository {
    base: BaseRepository<entity::Entity>,
    db: DatabaseConnection,
}

impl PgEnvironmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db.clone()),
            db,
        }
    }
}

fn apply_filter(
    mut query: sea_orm::Select<entity::Entity>,
    filter: &EnvironmentFilter,
) -> sea_orm::Select<entity::Entity> {
    if let Some(status) = filter.status {
        query = query.filter(entity::Column::Status.eq(status.to_string()));
    }
    query
        .order_by_desc(entity::Column::CreatedAt)
        .limit(filter.limit as u64)
        .offset(filter.offset as u64)
}

#[async_trait]
impl EnvironmentRepository for PgEnvironmentRepository {
    async fn create(&self, environment: Environment) -> EnvironmentResult<Environment> {
        let active_model: entity::ActiveModel = environment.into();
        let model = self
            .base
            .insert(active_model)
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> EnvironmentResult<Option<Environment>> {
        let model = self
            .base
            .find_by_id(id)
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(model.map(Into::into))
    }

    async fn find_by_hostname(&self, hostname: &str) -> EnvironmentResult<Option<Environment>> {
        let model = entity::Entity::find()
            .filter(entity::Column::CustomHostname.eq(hostname))
            .one(self.base.db())
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: EnvironmentFilter) -> EnvironmentResult<Vec<Environment>> {
        let query = apply_filter(entity::Entity::find(), &filter);
        let models = query
            .all(self.base.db())
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_owned_by(
        &self,
        owner_id: Uuid,
        filter: EnvironmentFilter,
    ) -> EnvironmentResult<Vec<Environment>> {
        let query = apply_filter(
            entity::Entity::find().filter(entity::Column::OwnerId.eq(owner_id)),
            &filter,
        );
        let models = query
            .all(self.base.db())
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        mutate: Box<dyn for<'r> FnOnce(&'r mut Environment) -> EnvironmentResult<()> + Send>,
    ) -> EnvironmentResult<Environment> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;

        let model = entity::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?
            .ok_or(EnvironmentError::NotFound(id))?;

        let mut environment: Environment = model.into();
        mutate(&mut environment)?;

        let active_model: entity::ActiveModel = environment.into();
        let updated = entity::Entity::update(active_model)
            .exec(&txn)
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;

        Ok(updated.into())
    }

    async fn list_running(&self) -> EnvironmentResult<Vec<Environment>> {
        let models = entity::Entity::find()
            .filter(entity::Column::Status.eq(EnvironmentStatus::Running.to_string()))
            .all(self.base.db())
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> EnvironmentResult<Vec<Environment>> {
        let models = entity::Entity::find()
            .filter(entity::Column::AutoDeleteAt.lte(now))
            .filter(entity::Column::Status.ne(EnvironmentStatus::Destroyed.to_string()))
            .filter(entity::Column::Status.ne(EnvironmentStatus::Destroying.to_string()))
            .all(self.base.db())
            .await
            .map_err(|e| EnvironmentError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
