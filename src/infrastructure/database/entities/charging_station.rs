//! ChargingStation entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "charging_stations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub station_code: String,

    #[sea_orm(nullable)]
    pub name: Option<String>,

    /// available, occupied, offline, faulted
    pub status: String,

    #[sea_orm(nullable)]
    pub vendor: Option<String>,

    #[sea_orm(nullable)]
    pub model: Option<String>,

    #[sea_orm(nullable)]
    pub serial_number: Option<String>,

    #[sea_orm(nullable)]
    pub firmware_version: Option<String>,

    #[sea_orm(nullable)]
    pub last_heartbeat: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charging_transaction::Entity")]
    ChargingTransactions,
}

impl Related<super::charging_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
