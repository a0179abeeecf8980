//! End-to-end checks of the `SeaOrmResource` derive against real SeaORM
//! entity definitions shaped like the control plane's own.

use core_proc_macros::{ApiResource, SeaOrmResource};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

// Derivation straight from the table name.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
#[sea_orm(table_name = "environments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[test]
fn derives_constants_from_the_table_name() {
    assert_eq!(Model::URL, "/environments");
    assert_eq!(Model::API_URL, "/api/environments");
    assert_eq!(Model::COLLECTION, "environments");
    assert_eq!(Model::TAG, "Environments");
}

// Underscored table names hyphenate in URLs and title-case in tags.
mod underscored {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
    #[sea_orm(table_name = "dns_records")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    #[test]
    fn hyphenates_url_and_title_cases_tag() {
        assert_eq!(Model::URL, "/dns-records");
        assert_eq!(Model::API_URL, "/api/dns-records");
        assert_eq!(Model::COLLECTION, "dns_records");
        assert_eq!(Model::TAG, "Dns Records");
    }
}

// Overrides pin what the API should expose when the table name is not it.
mod overridden {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, SeaOrmResource)]
    #[sea_orm(table_name = "emulated_resources")]
    #[sea_orm_resource(url = "/emulation", tag = "Cloud Emulation")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub external_id: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    #[test]
    fn explicit_url_and_tag_win() {
        assert_eq!(Model::URL, "/emulation");
        assert_eq!(Model::API_URL, "/api/emulation");
        assert_eq!(Model::COLLECTION, "emulated_resources");
        assert_eq!(Model::TAG, "Cloud Emulation");
    }
}
