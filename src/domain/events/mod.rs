//! Domain events
//!
//! The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{
    AuthorizationEvent, BootNotificationEvent, CommandCompletedEvent, CommandTimedOutEvent, Event,
    EventMessage, HeartbeatEvent, MeterSampleEvent, StationConnectedEvent,
    StationDisconnectedEvent, StationStatusChangedEvent, TransactionCompletedEvent,
    TransactionStartedEvent,
};
