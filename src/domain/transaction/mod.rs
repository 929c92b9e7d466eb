//! Charging transaction aggregate

pub mod model;
pub mod repository;

pub use model::{
    transaction_code, ChargingTransaction, NewTransaction, Settlement,
    SettlementReceipt, TransactionStatus, DEFAULT_STOP_REASON, INSUFFICIENT_BALANCE_REASON,
};
pub use repository::TransactionRepository;
