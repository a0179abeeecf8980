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
                    .as_enum(ServiceKind::Enum)
                    .values([
                        ServiceKind::Redis,
                        ServiceKind::Postgresql,
                        ServiceKind::PostgresqlSupabase,
                        ServiceKind::PostgresqlPgvector,
                        ServiceKind::PostgresqlPostgis,
                        ServiceKind::Mongodb,
                        ServiceKind::Mysql,
                        ServiceKind::Elasticmq,
                        ServiceKind::AwsS3,
                        ServiceKind::GcpStorage,
                        ServiceKind::AzureBlob,
                        ServiceKind::AwsEcr,
                        ServiceKind::AwsIam,
                        ServiceKind::AwsRoute53,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(ServiceInstanceStatus::Enum)
                    .values([
                        ServiceInstanceStatus::Provisioning,
                        ServiceInstanceStatus::Running,
                        ServiceInstanceStatus::Stopped,
                        ServiceInstanceStatus::Destroyed,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceInstances::Table)
                    .if_not_exists()
                    .col(pk_uuid(ServiceInstances::Id))
                    .col(uuid(ServiceInstances::EnvironmentId))
                    .col(
                        ColumnDef::new(ServiceInstances::ServiceKind)
                            .enumeration(
                                ServiceKind::Enum,
                                [
                                    ServiceKind::Redis,
                                    ServiceKind::Postgresql,
                                    ServiceKind::PostgresqlSupabase,
                                    ServiceKind::PostgresqlPgvector,
                                    ServiceKind::PostgresqlPostgis,
                                    ServiceKind::Mongodb,
                                    ServiceKind::Mysql,
                                    ServiceKind::Elasticmq,
                                    ServiceKind::AwsS3,
                                    ServiceKind::GcpStorage,
                                    ServiceKind::AzureBlob,
                                    ServiceKind::AwsEcr,
                                    ServiceKind::AwsIam,
                                    ServiceKind::AwsRoute53,
                                ],
                            )
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceInstances::Status)
                            .enumeration(
                                ServiceInstanceStatus::Enum,
                                [
                                    ServiceInstanceStatus::Provisioning,
                                    ServiceInstanceStatus::Running,
                                    ServiceInstanceStatus::Stopped,
                                    ServiceInstanceStatus::Destroyed,
                                ],
                            )
                            .not_null()
                            .default("provisioning"),
                    )
                    .col(string_null(ServiceInstances::ContainerId))
                    .col(string_null(ServiceInstances::ObjectStoreNamespace))
                    .col(json(ServiceInstances::Credentials).default("{}"))
                    .col(
                        timestamp_with_time_zone(ServiceInstances::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ServiceInstances::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(ServiceInstances::DestroyedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_instances_environment_id")
                            .from(ServiceInstances::Table, ServiceInstances::EnvironmentId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_instances_environment_id")
                    .table(ServiceInstances::Table)
                    .col(ServiceInstances::EnvironmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER service_instances_touch_updated_at
                    BEFORE UPDATE ON service_instances
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
            .execute_unprepared(
                "DROP TRIGGER IF EXISTS service_instances_touch_updated_at ON service_instances",
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ServiceInstances::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ServiceInstanceStatus::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ServiceKind::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ServiceInstances {
    Table,
    Id,
    EnvironmentId,
    ServiceKind,
    Status,
    ContainerId,
    ObjectStoreNamespace,
    Credentials,
    CreatedAt,
    UpdatedAt,
    DestroyedAt,
}

#[derive(DeriveIden)]
enum Environments {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ServiceKind {
    #[sea_orm(iden = "service_kind")]
    Enum,
    #[sea_orm(iden = "redis")]
    Redis,
    #[sea_orm(iden = "postgresql")]
    Postgresql,
    #[sea_orm(iden = "postgresql-supabase")]
    PostgresqlSupabase,
    #[sea_orm(iden = "postgresql-pgvector")]
    PostgresqlPgvector,
    #[sea_orm(iden = "postgresql-postgis")]
    PostgresqlPostgis,
    #[sea_orm(iden = "mongodb")]
    Mongodb,
    #[sea_orm(iden = "mysql")]
    Mysql,
    #[sea_orm(iden = "elasticmq")]
    Elasticmq,
    #[sea_orm(iden = "aws-s3")]
    AwsS3,
    #[sea_orm(iden = "gcp-storage")]
    GcpStorage,
    #[sea_orm(iden = "azure-blob")]
    AzureBlob,
    #[sea_orm(iden = "aws-ecr")]
    AwsEcr,
    #[sea_orm(iden = "aws-iam")]
    AwsIam,
    #[sea_orm(iden = "aws-route53")]
    AwsRoute53,
}

#[derive(DeriveIden)]
enum ServiceInstanceStatus {
    #[sea_orm(iden = "service_instance_status")]
    Enum,
    #[sea_orm(iden = "provisioning")]
    Provisioning,
    #[sea_orm(iden = "running")]
    Running,
    #[sea_orm(iden = "stopped")]
    Stopped,
    #[sea_orm(iden = "destroyed")]
    Destroyed,
}
