//! User aggregate
//!
//! Users and their vehicles are managed elsewhere; the gateway only reads them
//! and debits wallets during settlement.

pub mod model;
pub mod repository;

pub use model::{User, UserStatus, Vehicle};
pub use repository::UserRepository;
