use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(EnvironmentStatus::Enum)
                    .values([
                        EnvironmentStatus::Created,
                        EnvironmentStatus::Provisioning,
                        EnvironmentStatus::Running,
                        EnvironmentStatus::Stopped,
                        EnvironmentStatus::Destroying,
                        EnvironmentStatus::Destroyed,
                        EnvironmentStatus::Error,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Environments::Table)
                    .if_not_exists()
                    .col(pk_uuid(Environments::Id))
                    .col(uuid(Environments::OwnerId))
                    .col(string(Environments::Name))
                    .col(string_null(Environments::CustomHostname))
                    .col(
                        ColumnDef::new(Environments::Status)
                            .enumeration(
                                EnvironmentStatus::Enum,
                                [
                                    EnvironmentStatus::Created,
                                    EnvironmentStatus::Provisioning,
                                    EnvironmentStatus::Running,
                                    EnvironmentStatus::Stopped,
                                    EnvironmentStatus::Destroying,
                                    EnvironmentStatus::Destroyed,
                                    EnvironmentStatus::Error,
                                ],
                            )
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(Environments::AutoShutdownSeconds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(double(Environments::HourlyRate).default(0.0))
                    .col(double(Environments::AccruedCost).default(0.0))
                    .col(timestamp_with_time_zone_null(Environments::LastActivityAt))
                    .col(text_null(Environments::ErrorMessage))
                    .col(timestamp_with_time_zone_null(Environments::StartedAt))
                    .col(timestamp_with_time_zone_null(Environments::StoppedAt))
                    .col(timestamp_with_time_zone_null(Environments::AutoDeleteAt))
                    .col(
                        timestamp_with_time_zone(Environments::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Environments::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Environments::DestroyedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_environments_owner_id")
                            .from(Environments::Table, Environments::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_environments_owner_id")
                    .table(Environments::Table)
                    .col(Environments::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_environments_status")
                    .table(Environments::Table)
                    .col(Environments::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_environments_custom_hostname")
                    .table(Environments::Table)
                    .col(Environments::CustomHostname)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_environments_auto_delete_at")
                    .table(Environments::Table)
                    .col(Environments::AutoDeleteAt)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER environments_touch_updated_at
                    BEFORE UPDATE ON environments
                    FOR EACH ROW
                    EXECUTE FUNCTION util.touch_updated_at()
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TRIGGER IF EXISTS environments_touch_updated_at ON environments")
            .await?;

        manager
            .drop_table(Table::drop().table(Environments::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(EnvironmentStatus::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Environments {
    Table,
    Id,
    OwnerId,
    Name,
    CustomHostname,
    Status,
    AutoShutdownSeconds,
    HourlyRate,
    AccruedCost,
    LastActivityAt,
    ErrorMessage,
    StartedAt,
    StoppedAt,
    AutoDeleteAt,
    CreatedAt,
    UpdatedAt,
    DestroyedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum EnvironmentStatus {
    #[sea_orm(iden = "environment_status")]
    Enum,
    #[sea_orm(iden = "created")]
    Created,
    #[sea_orm(iden = "provisioning")]
    Provisioning,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "stopped")]
    Stopped,
    #[sea_orm(iden = "destroying")]
    Destroying,
    #[sea_orm(iden = "destroyed")]
    Destroyed,
    #[sea_orm(iden = "error")]
    Error,
}
