//! Charging station aggregate

pub mod model;
pub mod repository;

pub use model::{Station, StationInfo, StationStatus};
pub use repository::StationRepository;
