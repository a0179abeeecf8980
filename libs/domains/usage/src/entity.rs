use core_proc_macros::SeaOrmResource;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "usage_intervals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub environment_id: Uuid,
    pub period_start: DateTimeWithTimeZone,
    pub period_end: Option<DateTimeWithTimeZone>,
    pub hourly_rate: f64,
    pub computed_cost: Option<f64>,
    pub billed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::UsageInterval {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            environment_id: model.environment_id,
            period_start: model.period_start.into(),
            period_end: model.period_end.map(Into::into),
            hourly_rate: model.hourly_rate,
            computed_cost: model.computed_cost,
            billed: model.billed,
        }
    }
}

impl From<crate::models::UsageInterval> for ActiveModel {
    fn from(interval: crate::models::UsageInterval) -> Self {
        ActiveModel {
            id: Set(interval.id),
            environment_id: Set(interval.environment_id),
            period_start: Set(interval.period_start.into()),
            period_end: Set(interval.period_end.map(Into::into)),
            hourly_rate: Set(interval.hourly_rate),
            computed_cost: Set(interval.computed_cost),
            billed: Set(interval.billed),
        }
    }
}
