//! User entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(nullable)]
    pub full_name: Option<String>,

    /// active, inactive, suspended
    pub status: String,

    /// Prepaid balance in satang
    pub wallet_balance: i64,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vehicle::Entity")]
    Vehicles,
    #[sea_orm(has_many = "super::charging_transaction::Entity")]
    ChargingTransactions,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicles.def()
    }
}

impl Related<super::charging_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
