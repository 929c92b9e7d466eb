//! ChargingTransaction entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "charging_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// TX + YYYYMMDD + 4-digit daily sequence
    #[sea_orm(unique)]
    pub transaction_code: String,

    pub user_id: i32,
    pub vehicle_id: i32,
    pub station_id: i32,

    /// Id the station quotes in StopTransaction and MeterValues
    #[sea_orm(nullable, unique)]
    pub external_transaction_id: Option<i32>,

    /// preparing, charging, suspended, completed, faulted
    pub status: String,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,

    /// Meter register at start (kWh)
    #[sea_orm(column_type = "Double")]
    pub start_meter_value: f64,

    /// Meter register at stop (kWh)
    #[sea_orm(nullable, column_type = "Double")]
    pub end_meter_value: Option<f64>,

    /// kWh
    #[sea_orm(nullable, column_type = "Double")]
    pub energy_delivered: Option<f64>,

    /// Cost components in satang
    #[sea_orm(nullable)]
    pub solar_cost: Option<i64>,

    #[sea_orm(nullable)]
    pub pea_cost: Option<i64>,

    #[sea_orm(nullable)]
    pub total_cost: Option<i64>,

    /// Lower-cased stop reason reported by the station
    #[sea_orm(nullable)]
    pub stop_reason: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::charging_station::Entity",
        from = "Column::StationId",
        to = "super::charging_station::Column::Id"
    )]
    ChargingStation,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::charging_station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingStation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
