//! Create payment_transactions table (append-only)

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;
use super::m20240101_000005_create_charging_transactions::ChargingTransactions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentTransactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentTransactions::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(PaymentTransactions::ChargingTransactionId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentTransactions::PaymentType).string().not_null())
                    .col(ColumnDef::new(PaymentTransactions::PaymentMethod).string().not_null())
                    // Satang
                    .col(ColumnDef::new(PaymentTransactions::Amount).big_integer().not_null())
                    .col(ColumnDef::new(PaymentTransactions::Status).string().not_null())
                    .col(
                        ColumnDef::new(PaymentTransactions::ProcessedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transactions_user")
                            .from(PaymentTransactions::Table, PaymentTransactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transactions_charging_transaction")
                            .from(
                                PaymentTransactions::Table,
                                PaymentTransactions::ChargingTransactionId,
                            )
                            .to(ChargingTransactions::Table, ChargingTransactions::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PaymentTransactions {
    Table,
    Id,
    UserId,
    ChargingTransactionId,
    PaymentType,
    PaymentMethod,
    Amount,
    Status,
    ProcessedAt,
}
