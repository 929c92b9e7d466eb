//! SeaORM implementation of TransactionRepository
//!
//! Every multi-row change runs in one database transaction that only touches
//! the transaction handle; the pool may hold a single connection (SQLite).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, warn};

use super::db_err;
use crate::domain::pricing::model::{from_minor_units, kwh_from_f64, kwh_to_f64, to_minor_units};
use crate::domain::station::StationStatus;
use crate::domain::transaction::model::sequence_day;
use crate::domain::transaction::{
    transaction_code, ChargingTransaction, NewTransaction, Settlement, SettlementReceipt,
    TransactionRepository, TransactionStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::payment_transaction::{
    PAYMENT_METHOD_WALLET, PAYMENT_STATUS_COMPLETED, PAYMENT_TYPE_CHARGING,
};
use crate::infrastructure::database::entities::{
    charging_station, charging_transaction, payment_transaction, transaction_sequence, user,
};

pub struct SeaOrmTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn transaction_from_model(model: charging_transaction::Model) -> ChargingTransaction {
    ChargingTransaction {
        id: model.id,
        code: model.transaction_code,
        user_id: model.user_id,
        vehicle_id: model.vehicle_id,
        station_id: model.station_id,
        external_id: model.external_transaction_id,
        status: TransactionStatus::parse(&model.status).unwrap_or(TransactionStatus::Faulted),
        start_time: model.start_time,
        end_time: model.end_time,
        start_meter_kwh: kwh_from_f64(model.start_meter_value),
        end_meter_kwh: model.end_meter_value.map(kwh_from_f64),
        energy_kwh: model.energy_delivered.map(kwh_from_f64),
        solar_cost: model.solar_cost.map(from_minor_units),
        pea_cost: model.pea_cost.map(from_minor_units),
        total_cost: model.total_cost.map(from_minor_units),
        stop_reason: model.stop_reason,
    }
}

// ── Statement helpers ───────────────────────────────────────────

/// Bump the day's counter and return the new value. The upsert takes the row
/// lock, so concurrent allocations for the same day serialize.
async fn next_sequence<C: ConnectionTrait>(conn: &C, day: &str) -> DomainResult<i32> {
    transaction_sequence::Entity::insert(transaction_sequence::ActiveModel {
        day: Set(day.to_string()),
        last_value: Set(1),
    })
    .on_conflict(
        OnConflict::column(transaction_sequence::Column::Day)
            .value(
                transaction_sequence::Column::LastValue,
                Expr::col((
                    transaction_sequence::Entity,
                    transaction_sequence::Column::LastValue,
                ))
                .add(1),
            )
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await
    .map_err(db_err)?;

    let row = transaction_sequence::Entity::find_by_id(day.to_string())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| DomainError::not_found("transaction_sequence", "day", day))?;
    Ok(row.last_value)
}

async fn set_station_status<C: ConnectionTrait>(
    conn: &C,
    station_id: i32,
    status: StationStatus,
    at: DateTime<Utc>,
) -> DomainResult<()> {
    charging_station::Entity::update_many()
        .col_expr(charging_station::Column::Status, Expr::value(status.as_str()))
        .col_expr(charging_station::Column::UpdatedAt, Expr::value(at))
        .filter(charging_station::Column::Id.eq(station_id))
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Commit on success, roll back on failure.
async fn finish<T>(txn: DatabaseTransaction, result: DomainResult<T>) -> DomainResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(db_err)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn open_in(txn: &DatabaseTransaction, new: &NewTransaction) -> DomainResult<ChargingTransaction> {
    let sequence = next_sequence(txn, &sequence_day(new.day)).await?;
    let code = transaction_code(new.day, sequence.max(0) as u32);

    let model = charging_transaction::ActiveModel {
        id: NotSet,
        transaction_code: Set(code),
        user_id: Set(new.user_id),
        vehicle_id: Set(new.vehicle_id),
        station_id: Set(new.station_id),
        external_transaction_id: Set(None),
        status: Set(TransactionStatus::Preparing.as_str().to_string()),
        start_time: Set(new.start_time),
        end_time: Set(None),
        start_meter_value: Set(kwh_to_f64(new.start_meter_kwh)),
        end_meter_value: Set(None),
        energy_delivered: Set(None),
        solar_cost: Set(None),
        pea_cost: Set(None),
        total_cost: Set(None),
        stop_reason: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await
    .map_err(db_err)?;

    // The row id doubles as the station-facing id; it is unique and fits int32.
    let external_id = model.id;
    let mut active: charging_transaction::ActiveModel = model.into();
    active.external_transaction_id = Set(Some(external_id));
    let model = active.update(txn).await.map_err(db_err)?;

    set_station_status(txn, new.station_id, StationStatus::Occupied, new.start_time).await?;

    Ok(transaction_from_model(model))
}

async fn settle_in(txn: &DatabaseTransaction, s: &Settlement) -> DomainResult<SettlementReceipt> {
    // Guarded close: a concurrent settlement of the same transaction finds
    // nothing left to update.
    let closed = charging_transaction::Entity::update_many()
        .col_expr(
            charging_transaction::Column::Status,
            Expr::value(TransactionStatus::Completed.as_str()),
        )
        .col_expr(charging_transaction::Column::EndTime, Expr::value(s.end_time))
        .col_expr(
            charging_transaction::Column::EndMeterValue,
            Expr::value(kwh_to_f64(s.end_meter_kwh)),
        )
        .col_expr(
            charging_transaction::Column::EnergyDelivered,
            Expr::value(kwh_to_f64(s.energy_kwh)),
        )
        .col_expr(
            charging_transaction::Column::SolarCost,
            Expr::value(to_minor_units(s.cost.solar_cost)),
        )
        .col_expr(
            charging_transaction::Column::PeaCost,
            Expr::value(to_minor_units(s.cost.pea_cost)),
        )
        .col_expr(
            charging_transaction::Column::TotalCost,
            Expr::value(to_minor_units(s.cost.total_cost)),
        )
        .col_expr(
            charging_transaction::Column::StopReason,
            Expr::value(s.stop_reason.clone()),
        )
        .filter(charging_transaction::Column::Id.eq(s.transaction_id))
        .filter(charging_transaction::Column::Status.is_in(TransactionStatus::open_values()))
        .exec(txn)
        .await
        .map_err(db_err)?;

    if closed.rows_affected == 0 {
        return Err(DomainError::TransactionNotOpen(s.transaction_id));
    }

    // FOR UPDATE where the backend supports it; the guarded update below
    // keeps the balance non-negative either way.
    let wallet = user::Entity::find_by_id(s.user_id)
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| DomainError::not_found("user", "id", s.user_id))?;

    let amount = to_minor_units(s.cost.total_cost);
    let insufficient = || DomainError::InsufficientBalance {
        user_id: s.user_id,
        balance: from_minor_units(wallet.wallet_balance),
        required: s.cost.total_cost,
    };

    if wallet.wallet_balance < amount {
        return Err(insufficient());
    }

    let debited = user::Entity::update_many()
        .col_expr(
            user::Column::WalletBalance,
            Expr::col(user::Column::WalletBalance).sub(amount),
        )
        .filter(user::Column::Id.eq(s.user_id))
        .filter(user::Column::WalletBalance.gte(amount))
        .exec(txn)
        .await
        .map_err(db_err)?;

    if debited.rows_affected == 0 {
        return Err(insufficient());
    }

    let payment = payment_transaction::ActiveModel {
        id: NotSet,
        user_id: Set(s.user_id),
        charging_transaction_id: Set(s.transaction_id),
        payment_type: Set(PAYMENT_TYPE_CHARGING.to_string()),
        payment_method: Set(PAYMENT_METHOD_WALLET.to_string()),
        amount: Set(amount),
        status: Set(PAYMENT_STATUS_COMPLETED.to_string()),
        processed_at: Set(s.end_time),
    }
    .insert(txn)
    .await
    .map_err(db_err)?;

    set_station_status(txn, s.station_id, StationStatus::Available, s.end_time).await?;

    Ok(SettlementReceipt {
        transaction_id: s.transaction_id,
        payment_id: payment.id,
        amount: s.cost.total_cost,
        balance_after: from_minor_units(wallet.wallet_balance - amount),
    })
}

async fn fault_in(
    txn: &DatabaseTransaction,
    transaction_id: i32,
    stop_reason: &str,
    at: DateTime<Utc>,
) -> DomainResult<bool> {
    let Some(model) = charging_transaction::Entity::find_by_id(transaction_id)
        .one(txn)
        .await
        .map_err(db_err)?
    else {
        return Ok(false);
    };

    let closed = charging_transaction::Entity::update_many()
        .col_expr(
            charging_transaction::Column::Status,
            Expr::value(TransactionStatus::Faulted.as_str()),
        )
        .col_expr(charging_transaction::Column::EndTime, Expr::value(at))
        .col_expr(
            charging_transaction::Column::StopReason,
            Expr::value(stop_reason.to_string()),
        )
        .filter(charging_transaction::Column::Id.eq(transaction_id))
        .filter(charging_transaction::Column::Status.is_in(TransactionStatus::open_values()))
        .exec(txn)
        .await
        .map_err(db_err)?;

    if closed.rows_affected == 0 {
        return Ok(false);
    }

    set_station_status(txn, model.station_id, StationStatus::Available, at).await?;
    Ok(true)
}

#[async_trait]
impl TransactionRepository for SeaOrmTransactionRepository {
    async fn open(&self, new: NewTransaction) -> DomainResult<ChargingTransaction> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let result = open_in(&txn, &new).await;
        let transaction = finish(txn, result).await?;
        debug!(
            transaction_id = transaction.id,
            code = transaction.code.as_str(),
            "Transaction opened"
        );
        Ok(transaction)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingTransaction>> {
        let model = charging_transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(transaction_from_model))
    }

    async fn find_open_by_external_id(
        &self,
        external_id: i32,
    ) -> DomainResult<Option<ChargingTransaction>> {
        let model = charging_transaction::Entity::find()
            .filter(charging_transaction::Column::ExternalTransactionId.eq(external_id))
            .filter(charging_transaction::Column::Status.is_in(TransactionStatus::open_values()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(transaction_from_model))
    }

    async fn find_open_for_station(
        &self,
        station_id: i32,
    ) -> DomainResult<Option<ChargingTransaction>> {
        let model = charging_transaction::Entity::find()
            .filter(charging_transaction::Column::StationId.eq(station_id))
            .filter(charging_transaction::Column::Status.is_in(TransactionStatus::open_values()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(transaction_from_model))
    }

    async fn settle(&self, settlement: &Settlement) -> DomainResult<SettlementReceipt> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let result = settle_in(&txn, settlement).await;
        finish(txn, result).await
    }

    async fn transition_open_for_station(
        &self,
        station_id: i32,
        to: TransactionStatus,
    ) -> DomainResult<Option<i32>> {
        if !to.is_open() {
            return Err(DomainError::Validation(format!(
                "status report cannot close a transaction as {}",
                to.as_str()
            )));
        }
        let Some(open) = self.find_open_for_station(station_id).await? else {
            return Ok(None);
        };
        if open.status == to {
            return Ok(Some(open.id));
        }

        let result = charging_transaction::Entity::update_many()
            .col_expr(charging_transaction::Column::Status, Expr::value(to.as_str()))
            .filter(charging_transaction::Column::Id.eq(open.id))
            .filter(charging_transaction::Column::Status.is_in(TransactionStatus::open_values()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok((result.rows_affected > 0).then_some(open.id))
    }

    async fn fault(
        &self,
        transaction_id: i32,
        stop_reason: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let result = fault_in(&txn, transaction_id, stop_reason, at).await;
        finish(txn, result).await
    }
}
