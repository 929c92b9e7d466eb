//! WebSocket interface for charging stations

pub mod ocpp_server;

pub use ocpp_server::{extract_station_code, OcppServer};
