use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageIntervals::Table)
                    .if_not_exists()
                    .col(pk_uuid(UsageIntervals::Id))
                    .col(uuid(UsageIntervals::EnvironmentId))
                    .col(
                        timestamp_with_time_zone(UsageIntervals::PeriodStart)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(UsageIntervals::PeriodEnd))
                    .col(double(UsageIntervals::HourlyRate))
                    .col(double_null(UsageIntervals::ComputedCost))
                    .col(boolean(UsageIntervals::Billed).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_usage_intervals_environment_id")
                            .from(UsageIntervals::Table, UsageIntervals::EnvironmentId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one open interval (period_end IS NULL) per environment.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE UNIQUE INDEX idx_usage_intervals_open_per_environment
                    ON usage_intervals (environment_id)
                    WHERE period_end IS NULL
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_intervals_environment_id")
                    .table(UsageIntervals::Table)
                    .col(UsageIntervals::EnvironmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageIntervals::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum UsageIntervals {
    Table,
    Id,
    EnvironmentId,
    PeriodStart,
    PeriodEnd,
    HourlyRate,
    ComputedCost,
    Billed,
}

#[derive(DeriveIden)]
enum Environments {
    Table,
    Id,
}
