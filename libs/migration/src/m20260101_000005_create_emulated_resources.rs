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
                    .as_enum(ResourceFamily::Enum)
                    .values([
                        ResourceFamily::S3,
                        ResourceFamily::Gcs,
                        ResourceFamily::Blob,
                        ResourceFamily::Ec2,
                        ResourceFamily::Lambda,
                        ResourceFamily::Dynamodb,
                        ResourceFamily::Sqs,
                        ResourceFamily::Route53,
                        ResourceFamily::Iam,
                    ])
                    .to_owned(),
            )
            .await?;

        // Polymorphic across all emulated cloud-service families: the
        // per-family shape lives in `attributes`, translator modules own
        // interpreting it. Keeps one table instead of one per family while
        // every family still gets its own Rust translator.
        manager
            .create_table(
                Table::create()
                    .table(EmulatedResources::Table)
                    .if_not_exists()
                    .col(pk_uuid(EmulatedResources::Id))
                    .col(uuid(EmulatedResources::EnvironmentId))
                    .col(
                        ColumnDef::new(EmulatedResources::Family)
                            .enumeration(
                                ResourceFamily::Enum,
                                [
                                    ResourceFamily::S3,
                                    ResourceFamily::Gcs,
                                    ResourceFamily::Blob,
                                    ResourceFamily::Ec2,
                                    ResourceFamily::Lambda,
                                    ResourceFamily::Dynamodb,
                                    ResourceFamily::Sqs,
                                    ResourceFamily::Route53,
                                    ResourceFamily::Iam,
                                ],
                            )
                            .not_null(),
                    )
                    .col(string(EmulatedResources::Kind))
                    .col(string(EmulatedResources::ExternalId))
                    .col(string_null(EmulatedResources::ObjectStoreNamespace))
                    .col(string_null(EmulatedResources::ContainerId))
                    .col(json(EmulatedResources::Attributes).default("{}"))
                    .col(
                        timestamp_with_time_zone(EmulatedResources::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(EmulatedResources::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_emulated_resources_environment_id")
                            .from(EmulatedResources::Table, EmulatedResources::EnvironmentId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_emulated_resources_environment_id")
                    .table(EmulatedResources::Table)
                    .col(EmulatedResources::EnvironmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_emulated_resources_family_external_id")
                    .table(EmulatedResources::Table)
                    .col(EmulatedResources::Family)
                    .col(EmulatedResources::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TRIGGER emulated_resources_touch_updated_at
                    BEFORE UPDATE ON emulated_resources
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
                "DROP TRIGGER IF EXISTS emulated_resources_touch_updated_at ON emulated_resources",
            )
            .await?;

        manager
            .drop_table(Table::drop().table(EmulatedResources::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ResourceFamily::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum EmulatedResources {
    Table,
    Id,
    EnvironmentId,
    Family,
    Kind,
    ExternalId,
    ObjectStoreNamespace,
    ContainerId,
    Attributes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Environments {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ResourceFamily {
    #[sea_orm(iden = "resource_family")]
    Enum,
    #[sea_orm(iden = "s3")]
    S3,
    #[sea_orm(iden = "gcs")]
    Gcs,
    #[sea_orm(iden = "blob")]
    Blob,
    #[sea_orm(iden = "ec2")]
    Ec2,
    #[sea_orm(iden = "lambda")]
    Lambda,
    #[sea_orm(iden = "dynamodb")]
    Dynamodb,
    #[sea_orm(iden = "sqs")]
    Sqs,
    #[sea_orm(iden = "route53")]
    Route53,
    #[sea_orm(iden = "iam")]
    Iam,
}
