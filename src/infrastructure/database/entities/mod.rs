//! Database entities module

pub mod charging_station;
pub mod charging_transaction;
pub mod electricity_price;
pub mod ocpp_message;
pub mod payment_transaction;
pub mod transaction_sequence;
pub mod user;
pub mod vehicle;

pub use charging_station::Entity as ChargingStation;
pub use charging_transaction::Entity as ChargingTransaction;
pub use electricity_price::Entity as ElectricityPrice;
pub use ocpp_message::Entity as OcppMessage;
pub use payment_transaction::Entity as PaymentTransaction;
pub use transaction_sequence::Entity as TransactionSequence;
pub use user::Entity as User;
pub use vehicle::Entity as Vehicle;
