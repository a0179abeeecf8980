use crate::models::EnvironmentStatus;
use core_proc_macros::SeaOrmResource;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "environments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub custom_hostname: Option<String>,
    pub status: String, // stored as text, converted to/from EnvironmentStatus
    pub auto_shutdown_seconds: i64,
    pub hourly_rate: f64,
    pub accrued_cost: f64,
    pub last_activity_at: Option<DateTimeWithTimeZone>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTimeWithTimeZone>,
    pub stopped_at: Option<DateTimeWithTimeZone>,
    pub destroyed_at: Option<DateTimeWithTimeZone>,
    pub auto_delete_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Environment {
    fn from(model: Model) -> Self {
        let status = model
            .status
            .parse::<EnvironmentStatus>()
            .expect("invalid environment status in database");

        Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            custom_hostname: model.custom_hostname,
            status,
            auto_shutdown_seconds: model.auto_shutdown_seconds,
            hourly_rate: model.hourly_rate,
            accrued_cost: model.accrued_cost,
            last_activity_at: model.last_activity_at.map(|dt| dt.into()),
            error_message: model.error_message,
            started_at: model.started_at.map(|dt| dt.into()),
            stopped_at: model.stopped_at.map(|dt| dt.into()),
            destroyed_at: model.destroyed_at.map(|dt| dt.into()),
            auto_delete_at: model.auto_delete_at.map(|dt| dt.into()),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<crate::models::Environment> for ActiveModel {
    fn from(env: crate::models::Environment) -> Self {
        ActiveModel {
            id: Set(env.id),
            owner_id: Set(env.owner_id),
            name: Set(env.name),
            custom_hostname: Set(env.custom_hostname),
            status: Set(env.status.to_string()),
            auto_shutdown_seconds: Set(env.auto_shutdown_seconds),
            hourly_rate: Set(env.hourly_rate),
            accrued_cost: Set(env.accrued_cost),
            last_activity_at: Set(env.last_activity_at.map(|dt| dt.into())),
            error_message: Set(env.error_message),
            started_at: Set(env.started_at.map(|dt| dt.into())),
            stopped_at: Set(env.stopped_at.map(|dt| dt.into())),
            destroyed_at: Set(env.destroyed_at.map(|dt| dt.into())),
            auto_delete_at: Set(env.auto_delete_at.map(|dt| dt.into())),
            created_at: Set(env.created_at.into()),
            updated_at: Set(env.updated_at.into()),
        }
    }
}
