use crate::models::{ServiceInstanceStatus, ServiceKind};
use core_proc_macros::SeaOrmResource;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "service_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub environment_id: Uuid,
    pub service_kind: String,
    pub status: String,
    pub container_id: Option<String>,
    pub object_store_namespace: Option<String>,
    pub credentials: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub destroyed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::ServiceInstance {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            environment_id: model.environment_id,
            service_kind: model
                .service_kind
                .parse::<ServiceKind>()
                .expect("invalid service_kind in database"),
            status: model
                .status
                .parse::<ServiceInstanceStatus>()
                .expect("invalid status in database"),
            container_id: model.container_id,
            object_store_namespace: model.object_store_namespace,
            credentials: model.credentials,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            destroyed_at: model.destroyed_at.map(|dt| dt.into()),
        }
    }
}

impl From<crate::models::ServiceInstance> for ActiveModel {
    fn from(instance: crate::models::ServiceInstance) -> Self {
        ActiveModel {
            id: Set(instance.id),
            environment_id: Set(instance.environment_id),
            service_kind: Set(instance.service_kind.to_string()),
            status: Set(instance.status.to_string()),
            container_id: Set(instance.container_id),
            object_store_namespace: Set(instance.object_store_namespace),
            credentials: Set(instance.credentials),
            created_at: Set(instance.created_at.into()),
            updated_at: Set(instance.updated_at.into()),
            destroyed_at: Set(instance.destroyed_at.map(|dt| dt.into())),
        }
    }
}
