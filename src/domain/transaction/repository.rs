//! Transaction repository interface
//!
//! `open` and `settle` are single atomic units; a failure leaves no partial
//! writes behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{
    ChargingTransaction, NewTransaction, Settlement, SettlementReceipt, TransactionStatus,
};
use crate::domain::DomainResult;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Allocate the day's next code, insert the transaction as `preparing`
    /// with its station-facing id, and mark the station occupied. Fails with `Conflict` when the station
    /// already has an open transaction.
    async fn open(&self, new: NewTransaction) -> DomainResult<ChargingTransaction>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingTransaction>>;

    async fn find_open_by_external_id(
        &self,
        external_id: i32,
    ) -> DomainResult<Option<ChargingTransaction>>;

    async fn find_open_for_station(
        &self,
        station_id: i32,
    ) -> DomainResult<Option<ChargingTransaction>>;

    /// Complete the transaction, debit the wallet, append the payment record
    /// and release the station.
    ///
    /// Fails with `TransactionNotOpen` if another settlement got there first
    /// and with `InsufficientBalance` if the wallet cannot cover the cost.
    async fn settle(&self, settlement: &Settlement) -> DomainResult<SettlementReceipt>;

    /// Move the station's open transaction to another open status. Never
    /// finalizes; `to` must be open. Returns the transaction id if one was open.
    async fn transition_open_for_station(
        &self,
        station_id: i32,
        to: TransactionStatus,
    ) -> DomainResult<Option<i32>>;

    /// Close an open transaction as `faulted` without charging and release its
    /// station. Returns `false` if it was no longer open.
    async fn fault(&self, transaction_id: i32, stop_reason: &str, at: DateTime<Utc>)
        -> DomainResult<bool>;
}
