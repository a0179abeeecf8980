use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::BaseRepository;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::{
    entity,
    error::{UsageError, UsageResult},
    models::UsageInterval,
    repository::UsageIntervalRepository,
};

pub struct PgUsageIntervalRepository {
    base: BaseRepository<entity::Entity>,
    db: DatabaseConnection,
}

impl PgUsageIntervalRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl UsageIntervalRepository for PgUsageIntervalRepository {
    async fn open(&self, environment_id: Uuid, hourly_rate: f64, at: DateTime<Utc>) -> UsageResult<UsageInterval> {
        let interval = UsageInterval::open(environment_id, hourly_rate, at);
        let active_model: entity::ActiveModel = interval.into();
        let model = self
            .base
            .insert(active_model)
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;
        Ok(model.into())
    }

    async fn close(&self, environment_id: Uuid, at: DateTime<Utc>) -> UsageResult<Option<UsageInterval>> {
        let model = entity::Entity::find()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .filter(entity::Column::PeriodEnd.is_null())
            .one(self.base.db())
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;

        let Some(model) = model else {
            return Ok(None);
        };

        let mut interval: UsageInterval = model.into();
        interval.close(at);

        let active_model: entity::ActiveModel = interval.into();
        let updated = self
            .base
            .update(active_model)
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;
        Ok(Some(updated.into()))
    }

    async fn list_for_environment(&self, environment_id: Uuid) -> UsageResult<Vec<UsageInterval>> {
        let models = entity::Entity::find()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .all(self.base.db())
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_open_older_than(&self, threshold: DateTime<Utc>) -> UsageResult<Vec<UsageInterval>> {
        let models = entity::Entity::find()
            .filter(entity::Column::PeriodEnd.is_null())
            .filter(entity::Column::PeriodStart.lte(threshold))
            .all(self.base.db())
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn close_and_reopen_at_boundary(
        &self,
        interval_id: Uuid,
        boundary: DateTime<Utc>,
    ) -> UsageResult<(UsageInterval, UsageInterval)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;

        let model = entity::Entity::find_by_id(interval_id)
            .one(&txn)
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?
            .ok_or(UsageError::NotFound(interval_id))?;

        let mut closed: UsageInterval = model.into();
        closed.close(boundary);
        let active_model: entity::ActiveModel = closed.clone().into();
        entity::Entity::update(active_model)
            .exec(&txn)
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;

        let reopened = UsageInterval::open(closed.environment_id, closed.hourly_rate, boundary);
        let active_model: entity::ActiveModel = reopened.clone().into();
        entity::Entity::insert(active_model)
            .exec(&txn)
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| UsageError::Internal(format!("database error: {e}")))?;

        Ok((closed, reopened))
    }
}
