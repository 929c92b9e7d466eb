//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod pricing_repository;
pub mod repository_provider;
pub mod station_repository;
pub mod transaction_repository;
pub mod user_repository;

pub use pricing_repository::SeaOrmPricingRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use station_repository::SeaOrmStationRepository;
pub use transaction_repository::SeaOrmTransactionRepository;
pub use user_repository::SeaOrmUserRepository;

use sea_orm::{DbErr, SqlErr};

use crate::domain::DomainError;

/// Unique-constraint violations become `Conflict`; everything else is a storage failure.
pub(crate) fn db_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => DomainError::Conflict(detail),
        _ => DomainError::Storage(e.to_string()),
    }
}
