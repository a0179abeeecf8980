use crate::models::ResourceFamily;
use core_proc_macros::SeaOrmResource;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "emulated_resources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub environment_id: Uuid,
    pub family: String, // stored as text, converted to/from ResourceFamily
    pub kind: String,
    pub external_id: String,
    pub object_store_namespace: Option<String>,
    pub container_id: Option<String>,
    pub attributes: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::EmulatedResource {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            environment_id: model.environment_id,
            family: model
                .family
                .parse::<ResourceFamily>()
                .expect("invalid resource family in database"),
            kind: model.kind,
            external_id: model.external_id,
            object_store_namespace: model.object_store_namespace,
            container_id: model.container_id,
            attributes: model.attributes,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::EmulatedResource> for ActiveModel {
    fn from(resource: crate::models::EmulatedResource) -> Self {
        ActiveModel {
            id: Set(resource.id),
            environment_id: Set(resource.environment_id),
            family: Set(resource.family.to_string()),
            kind: Set(resource.kind),
            external_id: Set(resource.external_id),
            object_store_namespace: Set(resource.object_store_namespace),
            container_id: Set(resource.container_id),
            attributes: Set(resource.attributes),
            created_at: Set(resource.created_at.into()),
            updated_at: Set(resource.updated_at.into()),
        }
    }
}
