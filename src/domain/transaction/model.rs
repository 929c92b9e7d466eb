//! Charging transaction domain entity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::pricing::CostBreakdown;

/// Stop reason recorded when the station omits one.
pub const DEFAULT_STOP_REASON: &str = "remote";
/// Stop reason for transactions closed because the wallet could not cover them.
pub const INSUFFICIENT_BALANCE_REASON: &str = "insufficient_balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Preparing,
    Charging,
    Suspended,
    Completed,
    Faulted,
}

impl TransactionStatus {
    /// Statuses during which the station is held by the transaction.
    pub const OPEN: [TransactionStatus; 3] = [Self::Preparing, Self::Charging, Self::Suspended];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Charging => "charging",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Faulted => "faulted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preparing" => Some(Self::Preparing),
            "charging" => Some(Self::Charging),
            "suspended" => Some(Self::Suspended),
            "completed" => Some(Self::Completed),
            "faulted" => Some(Self::Faulted),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }

    /// Stored values of the open statuses, for status filters.
    pub fn open_values() -> Vec<&'static str> {
        Self::OPEN.iter().map(|s| s.as_str()).collect()
    }

    /// Open sub-state implied by a connector status report. A faulted
    /// connector suspends the session; only StopTransaction settles it.
    pub fn from_ocpp(status: &str) -> Option<Self> {
        match status {
            "Charging" => Some(Self::Charging),
            "SuspendedEV" | "SuspendedEVSE" | "Faulted" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// `TX` + `YYYYMMDD` + four-digit daily sequence, e.g. `TX202405010003`.
pub fn transaction_code(day: NaiveDate, sequence: u32) -> String {
    format!("TX{}{:04}", day.format("%Y%m%d"), sequence)
}

/// Sequence bucket key for a day.
pub fn sequence_day(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

#[derive(Debug, Clone)]
pub struct ChargingTransaction {
    pub id: i32,
    pub code: String,
    pub user_id: i32,
    pub vehicle_id: i32,
    pub station_id: i32,
    /// Id handed to the station in StartTransaction. Equal to `id`, which
    /// keeps it within the int32 range OCPP 1.6 firmware expects.
    pub external_id: Option<i32>,
    pub status: TransactionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_meter_kwh: Decimal,
    pub end_meter_kwh: Option<Decimal>,
    pub energy_kwh: Option<Decimal>,
    pub solar_cost: Option<Decimal>,
    pub pea_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub stop_reason: Option<String>,
}

/// Everything needed to open a transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i32,
    pub vehicle_id: i32,
    pub station_id: i32,
    pub start_time: DateTime<Utc>,
    pub start_meter_kwh: Decimal,
    /// Local calendar day the code sequence is drawn from.
    pub day: NaiveDate,
}

/// A finalization to apply atomically: transaction, wallet, payment, station.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction_id: i32,
    pub user_id: i32,
    pub station_id: i32,
    pub end_time: DateTime<Utc>,
    pub end_meter_kwh: Decimal,
    pub energy_kwh: Decimal,
    pub cost: CostBreakdown,
    pub stop_reason: String,
}

/// Result of a committed settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    pub transaction_id: i32,
    pub payment_id: i32,
    pub amount: Decimal,
    pub balance_after: Decimal,
}
