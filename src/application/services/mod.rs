//! Application services

pub mod charging;
pub mod heartbeat_monitor;
pub mod settlement;
pub mod station;

pub use charging::{
    AuthorizeOutcome, ChargingService, StartOutcome, StartRequest, StopOutcome, StopRequest,
};
pub use heartbeat_monitor::{HeartbeatConfig, HeartbeatMonitor, SweepReport};
pub use settlement::{CompletedSettlement, SettlementEngine};
pub use station::{StationService, StatusReport};
