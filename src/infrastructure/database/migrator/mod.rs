//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users;
mod m20240101_000002_create_vehicles;
mod m20240101_000003_create_charging_stations;
mod m20240101_000004_create_electricity_prices;
mod m20240101_000005_create_charging_transactions;
mod m20240101_000006_create_transaction_sequences;
mod m20240101_000007_create_payment_transactions;
mod m20240101_000008_create_ocpp_messages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users::Migration),
            Box::new(m20240101_000002_create_vehicles::Migration),
            Box::new(m20240101_000003_create_charging_stations::Migration),
            Box::new(m20240101_000004_create_electricity_prices::Migration),
            Box::new(m20240101_000005_create_charging_transactions::Migration),
            Box::new(m20240101_000006_create_transaction_sequences::Migration),
            Box::new(m20240101_000007_create_payment_transactions::Migration),
            Box::new(m20240101_000008_create_ocpp_messages::Migration),
        ]
    }
}
