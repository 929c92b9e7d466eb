//! Create electricity_prices table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ElectricityPrices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ElectricityPrices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    // pea | solar
                    .col(ColumnDef::new(ElectricityPrices::SourceType).string().not_null())
                    // Satang per kWh
                    .col(
                        ColumnDef::new(ElectricityPrices::PricePerKwh)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ElectricityPrices::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ElectricityPrices::EffectiveDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_electricity_prices_source_effective")
                    .table(ElectricityPrices::Table)
                    .col(ElectricityPrices::SourceType)
                    .col(ElectricityPrices::EffectiveDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ElectricityPrices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ElectricityPrices {
    Table,
    Id,
    SourceType,
    PricePerKwh,
    Status,
    EffectiveDate,
}
