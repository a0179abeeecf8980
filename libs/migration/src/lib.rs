pub use sea_orm_migration::prelude::*;

mod m20241128_000000_bootstrap;
mod m20241129_000000_create_users;
mod m20260101_000000_create_environments;
mod m20260101_000001_create_service_instances;
mod m20260101_000002_create_port_allocations;
mod m20260101_000003_create_usage_intervals;
mod m20260101_000004_create_dns_records;
mod m20260101_000005_create_emulated_resources;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241128_000000_bootstrap::Migration),
            Box::new(m20241129_000000_create_users::Migration),
            Box::new(m20260101_000000_create_environments::Migration),
            Box::new(m20260101_000001_create_service_instances::Migration),
            Box::new(m20260101_000002_create_port_allocations::Migration),
            Box::new(m20260101_000003_create_usage_intervals::Migration),
            Box::new(m20260101_000004_create_dns_records::Migration),
            Box::new(m20260101_000005_create_emulated_resources::Migration),
        ]
    }
}
