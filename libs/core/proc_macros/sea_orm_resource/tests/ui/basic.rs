//! A well-formed entity derives cleanly and exposes every constant.

use core_proc_macros::{ApiResource, SeaOrmResource};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "port_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub port: i32,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn main() {
    let _url = Model::URL;
    let _api_url = Model::API_URL;
    let _collection = Model::COLLECTION;
    let _tag = Model::TAG;
}
