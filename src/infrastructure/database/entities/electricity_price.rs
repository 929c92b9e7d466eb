//! ElectricityPrice entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "electricity_prices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// pea, solar
    pub source_type: String,
    /// Satang per kWh
    pub price_per_kwh: i64,
    /// active, inactive
    pub status: String,
    pub effective_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
