//! SeaORM implementation of PricingRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::db_err;
use crate::domain::pricing::model::from_minor_units;
use crate::domain::pricing::{PriceSource, PricingRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::electricity_price;

pub struct SeaOrmPricingRepository {
    db: DatabaseConnection,
}

impl SeaOrmPricingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PricingRepository for SeaOrmPricingRepository {
    async fn current_price(
        &self,
        source: PriceSource,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Decimal>> {
        let model = electricity_price::Entity::find()
            .filter(electricity_price::Column::SourceType.eq(source.as_str()))
            .filter(electricity_price::Column::Status.eq("active"))
            .filter(electricity_price::Column::EffectiveDate.lte(at))
            .order_by_desc(electricity_price::Column::EffectiveDate)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| from_minor_units(m.price_per_kwh)))
    }
}
