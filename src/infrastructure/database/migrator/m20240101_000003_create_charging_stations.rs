//! Create charging_stations table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingStations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingStations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChargingStations::StationCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ChargingStations::Name).string())
                    .col(
                        ColumnDef::new(ChargingStations::Status)
                            .string()
                            .not_null()
                            .default("offline"),
                    )
                    .col(ColumnDef::new(ChargingStations::Vendor).string())
                    .col(ColumnDef::new(ChargingStations::Model).string())
                    .col(ColumnDef::new(ChargingStations::SerialNumber).string())
                    .col(ColumnDef::new(ChargingStations::FirmwareVersion).string())
                    .col(ColumnDef::new(ChargingStations::LastHeartbeat).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChargingStations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingStations::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingStations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingStations {
    Table,
    Id,
    StationCode,
    Name,
    Status,
    Vendor,
    Model,
    SerialNumber,
    FirmwareVersion,
    LastHeartbeat,
    CreatedAt,
    UpdatedAt,
}
