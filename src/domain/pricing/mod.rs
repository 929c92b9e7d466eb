//! Electricity pricing

pub mod model;
pub mod repository;

pub use model::{CostBreakdown, PriceSource, Tariff};
pub use repository::PricingRepository;
