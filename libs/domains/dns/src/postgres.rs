use async_trait::async_trait;
use database::BaseRepository;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::{
    entity,
    error::{DnsError, DnsResult},
    models::{DnsRecord, DnsRecordFilter, RecordType},
    repository::DnsRecordRepository,
};

pub struct PgDnsRecordRepository {
    base: BaseRepository<entity::Entity>,
}

impl PgDnsRecordRepository {
    pub fn new(db: sea_orm::DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl DnsRecordRepository for PgDnsRecordRepository {
    async fn create(&self, record: DnsRecord) -> DnsResult<DnsRecord> {
        let active_model: entity::ActiveModel = record.into();
        let model = self
            .base
            .insert(active_model)
            .await
            .map_err(|e| DnsError::Internal(format!("database error: {e}")))?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> DnsResult<Option<DnsRecord>> {
        let model = self
            .base
            .find_by_id(id)
            .await
            .map_err(|e| DnsError::Internal(format!("database error: {e}")))?;
        Ok(model.map(Into::into))
    }

    async fn list_for_environment(
        &self,
        environment_id: Uuid,
        filter: DnsRecordFilter,
    ) -> DnsResult<Vec<DnsRecord>> {
        let mut query = entity::Entity::find().filter(entity::Column::EnvironmentId.eq(environment_id));
        if let Some(record_type) = filter.record_type {
            query = query.filter(entity::Column::RecordType.eq(record_type.to_string()));
        }
        let models = query
            .order_by_asc(entity::Column::CreatedAt)
            .all(self.base.db())
            .await
            .map_err(|e| DnsError::Internal(format!("database error: {e}")))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> DnsResult<()> {
        self.base
            .delete_by_id(id)
            .await
            .map_err(|e| DnsError::Internal(format!("database error: {e}")))?;
        Ok(())
    }

    async fn delete_for_environment(&self, environment_id: Uuid) -> DnsResult<()> {
        entity::Entity::delete_many()
            .filter(entity::Column::EnvironmentId.eq(environment_id))
            .exec(self.base.db())
            .await
            .map_err(|e| DnsError::Internal(format!("database error: {e}")))?;
        Ok(())
    }

    async fn find_oldest_match(&self, name: &str, record_type: RecordType) -> DnsResult<Option<DnsRecord>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Name.eq(name))
            .filter(entity::Column::RecordType.eq(record_type.to_string()))
            .order_by_asc(entity::Column::CreatedAt)
            .limit(1)
            .one(self.base.db())
            .await
            .map_err(|e| DnsError::Internal(format!("database error: {e}")))?;
        Ok(model.map(Into::into))
    }
}
