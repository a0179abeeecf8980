use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortAllocations::Table)
                    .if_not_exists()
                    .col(pk_uuid(PortAllocations::Id))
                    .col(uuid(PortAllocations::ServiceInstanceId))
                    .col(integer(PortAllocations::Port))
                    .col(boolean(PortAllocations::Active).default(true))
                    .col(
                        timestamp_with_time_zone(PortAllocations::AllocatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(PortAllocations::ReleasedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_port_allocations_service_instance_id")
                            .from(PortAllocations::Table, PortAllocations::ServiceInstanceId)
                            .to(ServiceInstances::Table, ServiceInstances::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one active allocation per port value at any instant.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE UNIQUE INDEX idx_port_allocations_active_port
                    ON port_allocations (port)
                    WHERE active
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_port_allocations_service_instance_id")
                    .table(PortAllocations::Table)
                    .col(PortAllocations::ServiceInstanceId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE port_allocations ADD CONSTRAINT chk_port_allocations_range \
                 CHECK (port >= 30000 AND port <= 40000)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortAllocations::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum PortAllocations {
    Table,
    Id,
    ServiceInstanceId,
    Port,
    Active,
    AllocatedAt,
    ReleasedAt,
}

#[derive(DeriveIden)]
enum ServiceInstances {
    Table,
    Id,
}
