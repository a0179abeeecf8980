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
                    .as_enum(DnsRecordType::Enum)
                    .values([
                        DnsRecordType::A,
                        DnsRecordType::Aaaa,
                        DnsRecordType::Cname,
                        DnsRecordType::Mx,
                        DnsRecordType::Txt,
                        DnsRecordType::Ns,
                        DnsRecordType::Srv,
                        DnsRecordType::Ptr,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DnsRecords::Table)
                    .if_not_exists()
                    .col(pk_uuid(DnsRecords::Id))
                    .col(uuid(DnsRecords::EnvironmentId))
                    .col(string(DnsRecords::Name))
                    .col(
                        ColumnDef::new(DnsRecords::RecordType)
                            .enumeration(
                                DnsRecordType::Enum,
                                [
                                    DnsRecordType::A,
                                    DnsRecordType::Aaaa,
                                    DnsRecordType::Cname,
                                    DnsRecordType::Mx,
                                    DnsRecordType::Txt,
                                    DnsRecordType::Ns,
                                    DnsRecordType::Srv,
                                    DnsRecordType::Ptr,
                                ],
                            )
                            .not_null(),
                    )
                    .col(text(DnsRecords::Value))
                    .col(integer(DnsRecords::Ttl).default(300))
                    .col(small_integer_null(DnsRecords::Priority))
                    .col(small_integer_null(DnsRecords::Weight))
                    .col(integer_null(DnsRecords::Port))
                    .col(
                        timestamp_with_time_zone(DnsRecords::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_dns_records_environment_id")
                            .from(DnsRecords::Table, DnsRecords::EnvironmentId)
                            .to(Environments::Table, Environments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_dns_records_environment_name_type_value")
                    .table(DnsRecords::Table)
                    .col(DnsRecords::EnvironmentId)
                    .col(DnsRecords::Name)
                    .col(DnsRecords::RecordType)
                    .col(DnsRecords::Value)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Multi-tenant UDP lookup by (name, type), oldest match wins.
        manager
            .create_index(
                Index::create()
                    .name("idx_dns_records_name_type_created_at")
                    .table(DnsRecords::Table)
                    .col(DnsRecords::Name)
                    .col(DnsRecords::RecordType)
                    .col(DnsRecords::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DnsRecords::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(DnsRecordType::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum DnsRecords {
    Table,
    Id,
    EnvironmentId,
    Name,
    RecordType,
    Value,
    Ttl,
    Priority,
    Weight,
    Port,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Environments {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum DnsRecordType {
    #[sea_orm(iden = "dns_record_type")]
    Enum,
    #[sea_orm(iden = "A")]
    A,
    #[sea_orm(iden = "AAAA")]
    Aaaa,
    #[sea_orm(iden = "CNAME")]
    Cname,
    #[sea_orm(iden = "MX")]
    Mx,
    #[sea_orm(iden = "TXT")]
    Txt,
    #[sea_orm(iden = "NS")]
    Ns,
    #[sea_orm(iden = "SRV")]
    Srv,
    #[sea_orm(iden = "PTR")]
    Ptr,
}
