//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::pricing::PricingRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::station::StationRepository;
use crate::domain::transaction::TransactionRepository;
use crate::domain::user::UserRepository;

use super::pricing_repository::SeaOrmPricingRepository;
use super::station_repository::SeaOrmStationRepository;
use super::transaction_repository::SeaOrmTransactionRepository;
use super::user_repository::SeaOrmUserRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let station = repos.stations().find_by_code("ST-001").await?;
/// let open = repos.transactions().find_open_for_station(station.id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    stations: SeaOrmStationRepository,
    users: SeaOrmUserRepository,
    transactions: SeaOrmTransactionRepository,
    pricing: SeaOrmPricingRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            stations: SeaOrmStationRepository::new(db.clone()),
            users: SeaOrmUserRepository::new(db.clone()),
            transactions: SeaOrmTransactionRepository::new(db.clone()),
            pricing: SeaOrmPricingRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }

    fn pricing(&self) -> &dyn PricingRepository {
        &self.pricing
    }
}
