//! Daily transaction-number counter

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transaction_sequences")]
pub struct Model {
    /// YYYYMMDD
    #[sea_orm(primary_key, auto_increment = false)]
    pub day: String,
    pub last_value: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
