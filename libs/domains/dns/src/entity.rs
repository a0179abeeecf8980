use crate::models::RecordType;
use core_proc_macros::SeaOrmResource;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "dns_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub environment_id: Uuid,
    pub name: String,
    pub record_type: String,
    pub value: String,
    pub ttl: i32,
    pub priority: Option<i16>,
    pub weight: Option<i16>,
    pub port: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::DnsRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            environment_id: model.environment_id,
            name: model.name,
            record_type: model
                .record_type
                .parse::<RecordType>()
                .expect("invalid record_type in database"),
            value: model.value,
            ttl: model.ttl,
            priority: model.priority,
            weight: model.weight,
            port: model.port,
            created_at: model.created_at.into(),
        }
    }
}

impl From<crate::models::DnsRecord> for ActiveModel {
    fn from(record: crate::models::DnsRecord) -> Self {
        ActiveModel {
            id: Set(record.id),
            environment_id: Set(record.environment_id),
            name: Set(record.name),
            record_type: Set(record.record_type.to_string()),
            value: Set(record.value),
            ttl: Set(record.ttl),
            priority: Set(record.priority),
            weight: Set(record.weight),
            port: Set(record.port),
            created_at: Set(record.created_at.into()),
        }
    }
}
