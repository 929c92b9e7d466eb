//! PaymentTransaction entity

use sea_orm::entity::prelude::*;

pub const PAYMENT_TYPE_CHARGING: &str = "charging";
pub const PAYMENT_METHOD_WALLET: &str = "wallet";
pub const PAYMENT_STATUS_COMPLETED: &str = "completed";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub charging_transaction_id: i32,
    pub payment_type: String,
    pub payment_method: String,
    /// Satang
    pub amount: i64,
    pub status: String,
    pub processed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_transaction::Entity",
        from = "Column::ChargingTransactionId",
        to = "super::charging_transaction::Column::Id"
    )]
    ChargingTransaction,
}

impl Related<super::charging_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
