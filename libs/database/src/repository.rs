//! Generic CRUD repository built on top of a SeaORM entity.
//!
//! Every domain's Postgres repository wraps a `BaseRepository<entity::Entity>`
//! instead of hand-rolling `insert`/`find_by_id`/`update`/`delete_by_id`
//! against the connection directly.

use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, PrimaryKeyTrait,
};
use std::marker::PhantomData;
use uuid::Uuid;

/// A SeaORM entity whose primary key is a UUID.
///
/// `BaseRepository` is generic over this so every domain crate gets
/// `find_by_id`/`delete_by_id` taking a plain `Uuid` rather than SeaORM's
/// more general primary-key value type.
pub trait UuidEntity: EntityTrait
where
    <Self::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
}

impl<E> UuidEntity for E
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
}

/// Shared CRUD helper wrapping a single SeaORM entity's connection.
pub struct BaseRepository<E>
where
    E: UuidEntity,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    db: DatabaseConnection,
    _entity: PhantomData<E>,
}

impl<E> BaseRepository<E>
where
    E: UuidEntity,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// Raw connection access for queries the generic helpers don't cover
    /// (filtering, pagination, joins).
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn insert(&self, active_model: E::ActiveModel) -> Result<E::Model, DbErr>
    where
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<E::ActiveModel>,
    {
        active_model.insert(&self.db).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<E::Model>, DbErr> {
        E::find_by_id(id).one(&self.db).await
    }

    pub async fn update(&self, active_model: E::ActiveModel) -> Result<E::Model, DbErr>
    where
        E::ActiveModel: ActiveModelTrait<Entity = E> + Send,
        E::Model: IntoActiveModel<E::ActiveModel>,
    {
        active_model.update(&self.db).await
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<u64, DbErr> {
        let result = E::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}
