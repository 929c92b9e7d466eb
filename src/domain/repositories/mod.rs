//! Repository access for the application layer
//!
//! `RepositoryProvider` hands out the per-aggregate repositories; consumers
//! ask only for the one they need:
//!
//! ```ignore
//! let station = repos.stations().find_by_code("ST-001").await?;
//! ```

use super::pricing::PricingRepository;
use super::station::StationRepository;
use super::transaction::TransactionRepository;
use super::user::UserRepository;

pub use crate::shared::errors::DomainResult;

pub trait RepositoryProvider: Send + Sync {
    fn stations(&self) -> &dyn StationRepository;
    fn users(&self) -> &dyn UserRepository;
    fn transactions(&self) -> &dyn TransactionRepository;
    fn pricing(&self) -> &dyn PricingRepository;
}
