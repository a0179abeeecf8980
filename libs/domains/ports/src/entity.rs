use core_proc_macros::SeaOrmResource;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "port_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub service_instance_id: Uuid,
    pub port: i32,
    pub active: bool,
    pub allocated_at: DateTimeWithTimeZone,
    pub released_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::PortAllocation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            service_instance_id: model.service_instance_id,
            port: model.port as u16,
            active: model.active,
            allocated_at: model.allocated_at.into(),
            released_at: model.released_at.map(Into::into),
        }
    }
}

impl From<crate::models::PortAllocation> for ActiveModel {
    fn from(allocation: crate::models::PortAllocation) -> Self {
        ActiveModel {
            id: Set(allocation.id),
            service_instance_id: Set(allocation.service_instance_id),
            port: Set(allocation.port as i32),
            active: Set(allocation.active),
            allocated_at: Set(allocation.allocated_at.into()),
            released_at: Set(allocation.released_at.map(Into::into)),
        }
    }
}
