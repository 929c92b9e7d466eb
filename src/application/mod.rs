pub mod commands;
pub mod events;
pub mod handlers;
pub mod services;
pub mod session;

pub use commands::{
    remote_start_transaction, remote_stop_transaction, reset, unlock_connector, CommandError,
    CommandSender, IssuedCommand, ResetKind, SharedCommandSender,
};
pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use handlers::{GatewayServices, OcppHandler};
pub use services::{ChargingService, HeartbeatMonitor, SettlementEngine, StationService};
pub use session::{SessionRegistry, SharedSessionRegistry};
