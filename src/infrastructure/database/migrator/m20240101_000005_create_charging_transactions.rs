//! Create charging_transactions table
//!
//! A partial unique index on `station_id` over the open statuses guarantees
//! at most one open transaction per station, even under concurrent starts.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20240101_000001_create_users::Users;
use super::m20240101_000002_create_vehicles::Vehicles;
use super::m20240101_000003_create_charging_stations::ChargingStations;

const OPEN_PER_STATION_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     uq_charging_transactions_open_station ON charging_transactions (station_id) \
     WHERE status IN ('preparing', 'charging', 'suspended')";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChargingTransactions::TransactionCode)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ChargingTransactions::UserId).integer().not_null())
                    .col(ColumnDef::new(ChargingTransactions::VehicleId).integer().not_null())
                    .col(ColumnDef::new(ChargingTransactions::StationId).integer().not_null())
                    .col(ColumnDef::new(ChargingTransactions::ExternalTransactionId).integer())
                    .col(
                        ColumnDef::new(ChargingTransactions::Status)
                            .string()
                            .not_null()
                            .default("preparing"),
                    )
                    .col(
                        ColumnDef::new(ChargingTransactions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingTransactions::EndTime).timestamp_with_time_zone())
                    // kWh
                    .col(
                        ColumnDef::new(ChargingTransactions::StartMeterValue)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingTransactions::EndMeterValue).double())
                    .col(ColumnDef::new(ChargingTransactions::EnergyDelivered).double())
                    // Satang
                    .col(ColumnDef::new(ChargingTransactions::SolarCost).big_integer())
                    .col(ColumnDef::new(ChargingTransactions::PeaCost).big_integer())
                    .col(ColumnDef::new(ChargingTransactions::TotalCost).big_integer())
                    .col(ColumnDef::new(ChargingTransactions::StopReason).string())
                    .col(
                        ColumnDef::new(ChargingTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_transactions_user")
                            .from(ChargingTransactions::Table, ChargingTransactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_transactions_vehicle")
                            .from(ChargingTransactions::Table, ChargingTransactions::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_transactions_station")
                            .from(ChargingTransactions::Table, ChargingTransactions::StationId)
                            .to(ChargingStations::Table, ChargingStations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_charging_transactions_external_id")
                    .table(ChargingTransactions::Table)
                    .col(ChargingTransactions::ExternalTransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_transactions_status")
                    .table(ChargingTransactions::Table)
                    .col(ChargingTransactions::Status)
                    .to_owned(),
            )
            .await?;

        // Partial indexes are not expressible through the schema builder.
        manager
            .get_connection()
            .execute_unprepared(OPEN_PER_STATION_INDEX)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingTransactions {
    Table,
    Id,
    TransactionCode,
    UserId,
    VehicleId,
    StationId,
    ExternalTransactionId,
    Status,
    StartTime,
    EndTime,
    StartMeterValue,
    EndMeterValue,
    EnergyDelivered,
    SolarCost,
    PeaCost,
    TotalCost,
    StopReason,
    CreatedAt,
}
