//! Settlement engine: prices a finished session and closes it atomically

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::{PricingConfig, SettlementConfig};
use crate::domain::pricing::{CostBreakdown, PriceSource, Tariff};
use crate::domain::transaction::INSUFFICIENT_BALANCE_REASON;
use crate::domain::{
    ChargingTransaction, DomainError, DomainResult, RepositoryProvider, Settlement,
    SettlementReceipt,
};

/// What a committed settlement charged.
#[derive(Debug, Clone)]
pub struct CompletedSettlement {
    pub settlement: Settlement,
    pub receipt: SettlementReceipt,
}

pub struct SettlementEngine {
    repos: Arc<dyn RepositoryProvider>,
    fallback: Tariff,
    fault_on_insufficient_balance: bool,
}

impl SettlementEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        pricing: &PricingConfig,
        settlement: &SettlementConfig,
    ) -> Self {
        Self {
            repos,
            fallback: Tariff {
                pea_per_kwh: pricing.pea_per_kwh,
                solar_per_kwh: pricing.solar_per_kwh,
            },
            fault_on_insufficient_balance: settlement.fault_on_insufficient_balance,
        }
    }

    /// Active prices at `at`, falling back to the configured ones per source.
    pub async fn current_tariff(&self, at: DateTime<Utc>) -> DomainResult<Tariff> {
        let pricing = self.repos.pricing();
        let pea = pricing.current_price(PriceSource::Pea, at).await?;
        let solar = pricing.current_price(PriceSource::Solar, at).await?;
        Ok(Tariff {
            pea_per_kwh: pea.unwrap_or(self.fallback.pea_per_kwh),
            solar_per_kwh: solar.unwrap_or(self.fallback.solar_per_kwh),
        })
    }

    /// Close `transaction` at `end_meter_kwh`, debit the wallet and release
    /// the station. Nothing is written when this fails, except that a
    /// shortfall closes the transaction as faulted when configured to.
    pub async fn settle(
        &self,
        transaction: &ChargingTransaction,
        end_meter_kwh: Decimal,
        stop_reason: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<CompletedSettlement> {
        let energy_kwh = end_meter_kwh - transaction.start_meter_kwh;
        if energy_kwh < Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "meter stop {} kWh is below meter start {} kWh",
                end_meter_kwh, transaction.start_meter_kwh
            )));
        }

        let tariff = self.current_tariff(at).await?;
        let cost = CostBreakdown::calculate(energy_kwh, &tariff);

        let settlement = Settlement {
            transaction_id: transaction.id,
            user_id: transaction.user_id,
            station_id: transaction.station_id,
            end_time: at,
            end_meter_kwh,
            energy_kwh,
            cost,
            stop_reason: stop_reason.to_string(),
        };

        match self.repos.transactions().settle(&settlement).await {
            Ok(receipt) => {
                info!(
                    transaction_id = transaction.id,
                    code = transaction.code.as_str(),
                    energy_kwh = %energy_kwh,
                    total_cost = %cost.total_cost,
                    balance_after = %receipt.balance_after,
                    "Transaction settled"
                );
                metrics::counter!("gateway_settlements_total", "result" => "completed").increment(1);
                Ok(CompletedSettlement { settlement, receipt })
            }
            Err(e @ DomainError::InsufficientBalance { .. }) => {
                metrics::counter!("gateway_settlements_total", "result" => "insufficient_balance")
                    .increment(1);
                if self.fault_on_insufficient_balance {
                    let closed = self
                        .repos
                        .transactions()
                        .fault(transaction.id, INSUFFICIENT_BALANCE_REASON, at)
                        .await?;
                    warn!(
                        transaction_id = transaction.id,
                        closed, "Wallet short, transaction closed as faulted"
                    );
                } else {
                    warn!(
                        transaction_id = transaction.id,
                        error = %e,
                        "Wallet short, transaction left open"
                    );
                }
                Err(e)
            }
            Err(e) => {
                metrics::counter!("gateway_settlements_total", "result" => "failed").increment(1);
                Err(e)
            }
        }
    }
}
