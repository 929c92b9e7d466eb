//! Create ocpp_messages table (audit trail)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OcppMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OcppMessages::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OcppMessages::StationCode).string().not_null())
                    .col(ColumnDef::new(OcppMessages::Direction).string().not_null())
                    .col(ColumnDef::new(OcppMessages::MessageType).string().not_null())
                    .col(ColumnDef::new(OcppMessages::Action).string())
                    .col(ColumnDef::new(OcppMessages::MessageId).string())
                    .col(ColumnDef::new(OcppMessages::Payload).text().not_null())
                    .col(
                        ColumnDef::new(OcppMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ocpp_messages_station_created")
                    .table(OcppMessages::Table)
                    .col(OcppMessages::StationCode)
                    .col(OcppMessages::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OcppMessages::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum OcppMessages {
    Table,
    Id,
    StationCode,
    Direction,
    MessageType,
    Action,
    MessageId,
    Payload,
    CreatedAt,
}
