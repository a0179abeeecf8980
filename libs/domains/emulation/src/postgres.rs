use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use database::BaseRepository;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use uuid::Uuid;

use crate::{
    entity,
    error::{EmulationError, EmulationResult},
    models::{EmulatedResource, ResourceFamily},
    repository::EmulatedResourceRepository,
    sqs,
};

pub struct PgEmulatedResourceRepository {
    base: BaseRepository<entity::Entity>,
    db: DatabaseConnection,
}

impl PgEmulatedResourceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db.clone()),
            db,
        }
    }
}

fn internal(e: impl std::fmt::Display) -> EmulationError {
    EmulationError::Internal(format!("database error: {e}"))
}

#[async_trait]
impl EmulatedResourceRepository for PgEmulatedResourceRepository {
    async fn create(&self, resource: EmulatedResource) -> EmulationResult<EmulatedResource> {
        let active_model: entity::ActiveModel = resource.into();
        let model = self.base.insert(active_model).await.map_err(internal)?;
        Ok(model.into())
    }

    async fn update(&self, resource: EmulatedResource) -> EmulationResult<EmulatedResource> {
        let active_model: entity::ActiveModel = resource.into();
        let model = self.base.update(active_model).await.map_err(internal)?;
        Ok(model.into())
    }

    async fn get(&self, family: ResourceFamily, external_id: &str) -> EmulationResult<Option<EmulatedResource>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Family.eq(family.to_string()))
            .filter(entity::Column::ExternalId.eq(external_id))
            .one(self.base.db())
            .await
            .map_err(internal)?;
        Ok(model.map(Into::into))
    }

    async fn list(
        &self,
        environment_id: Uuid,
        family: ResourceFamily,
        kind: &str,
    ) -> EmulationResult<Vec<EmulatedResource>> {
        let models = entity::Entity::find()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .filter(entity::Column::Family.eq(family.to_string()))
            .filter(entity::Column::Kind.eq(kind))
            .order_by_asc(entity::Column::CreatedAt)
            .all(self.base.db())
            .await
            .map_err(internal)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_for_environment(&self, environment_id: Uuid) -> EmulationResult<Vec<EmulatedResource>> {
        let models = entity::Entity::find()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .all(self.base.db())
            .await
            .map_err(internal)?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> EmulationResult<()> {
        self.base.delete_by_id(id).await.map_err(internal)?;
        Ok(())
    }

    async fn delete_for_environment(&self, environment_id: Uuid) -> EmulationResult<()> {
        entity::Entity::delete_many()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .exec(self.base.db())
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn claim_queue_messages(
        &self,
        environment_id: Uuid,
        queue_url: &str,
        max: usize,
        visibility: Duration,
    ) -> EmulationResult<Vec<EmulatedResource>> {
        use sea_orm::QuerySelect;

        let txn = self.db.begin().await.map_err(internal)?;

        // Row-level lock on the environment's message rows serializes
        // concurrent receivers; the queue/visibility filters are applied on
        // the JSON payload after the fetch.
        let models = entity::Entity::find()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .filter(entity::Column::Family.eq(ResourceFamily::Sqs.to_string()))
            .filter(entity::Column::Kind.eq("message"))
            .order_by_asc(entity::Column::CreatedAt)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(internal)?;

        let now = Utc::now();
        let mut claimed = Vec::new();

        for model in models {
            if claimed.len() >= max {
                break;
            }

            let mut message: EmulatedResource = model.into();
            if message.attr_str("queue_url") != Some(queue_url) {
                continue;
            }
            let visible_at = message
                .attr_str("visible_at")
                .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                .unwrap_or(now);
            if visible_at > now {
                continue;
            }

            sqs::stamp_received(&mut message, now + visibility);

            let active_model: entity::ActiveModel = message.clone().into();
            entity::Entity::update(active_model)
                .exec(&txn)
                .await
                .map_err(internal)?;
            claimed.push(message);
        }

        txn.commit().await.map_err(internal)?;
        Ok(claimed)
    }
}
