pub mod audit;
pub mod events;
pub mod pricing;
pub mod repositories;
pub mod station;
pub mod transaction;
pub mod user;

pub use audit::{AuditEntry, AuditLogger, Direction};
pub use pricing::{CostBreakdown, PriceSource, PricingRepository, Tariff};
pub use repositories::{DomainResult, RepositoryProvider};
pub use station::{Station, StationInfo, StationRepository, StationStatus};
pub use transaction::{
    ChargingTransaction, NewTransaction, Settlement, SettlementReceipt, TransactionRepository,
    TransactionStatus,
};
pub use user::{User, UserRepository, UserStatus, Vehicle};

pub use crate::shared::errors::DomainError;
