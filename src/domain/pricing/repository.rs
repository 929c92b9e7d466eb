use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::model::PriceSource;
use crate::domain::DomainResult;

#[async_trait]
pub trait PricingRepository: Send + Sync {
    /// Price per kWh of the active row with the latest effective date not after `at`.
    async fn current_price(
        &self,
        source: PriceSource,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<Decimal>>;
}
