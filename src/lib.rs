//! # EV charging gateway
//!
//! OCPP-J 1.6 central system for a fleet of charging stations with
//! prepaid wallets and split PEA/solar pricing.
//!
//! ## Architecture
//!
//! - **domain**: entities, repository traits and the pricing rules
//! - **application**: message handlers, charging sessions, settlement,
//!   outbound commands and connection tracking
//! - **infrastructure**: SeaORM persistence and the message audit log
//! - **interfaces**: the OCPP WebSocket listener
//! - **server**: process wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

#[cfg(test)]
mod test_support;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use server::{init_tracing, ServerHandle, ServerOptions};
