//! Create transaction_sequences table
//!
//! One row per calendar day holding the last transaction number handed out.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TransactionSequences::Table)
                    .if_not_exists()
                    // YYYYMMDD
                    .col(
                        ColumnDef::new(TransactionSequences::Day)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionSequences::LastValue)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionSequences::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum TransactionSequences {
    Table,
    Day,
    LastValue,
}
