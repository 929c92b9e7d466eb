//! Gateway events
//!
//! Facts published on the event bus for dashboards and other observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    StationConnected(StationConnectedEvent),
    StationDisconnected(StationDisconnectedEvent),
    StationStatusChanged(StationStatusChangedEvent),
    BootNotification(BootNotificationEvent),
    HeartbeatReceived(HeartbeatEvent),
    AuthorizationResult(AuthorizationEvent),
    TransactionStarted(TransactionStartedEvent),
    TransactionCompleted(TransactionCompletedEvent),
    MeterSample(MeterSampleEvent),
    CommandCompleted(CommandCompletedEvent),
    CommandTimedOut(CommandTimedOutEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StationConnected(_) => "station_connected",
            Event::StationDisconnected(_) => "station_disconnected",
            Event::StationStatusChanged(_) => "station_status_changed",
            Event::BootNotification(_) => "boot_notification",
            Event::HeartbeatReceived(_) => "heartbeat_received",
            Event::AuthorizationResult(_) => "authorization_result",
            Event::TransactionStarted(_) => "transaction_started",
            Event::TransactionCompleted(_) => "transaction_completed",
            Event::MeterSample(_) => "meter_sample",
            Event::CommandCompleted(_) => "command_completed",
            Event::CommandTimedOut(_) => "command_timed_out",
        }
    }

    pub fn station_code(&self) -> &str {
        match self {
            Event::StationConnected(e) => &e.station_code,
            Event::StationDisconnected(e) => &e.station_code,
            Event::StationStatusChanged(e) => &e.station_code,
            Event::BootNotification(e) => &e.station_code,
            Event::HeartbeatReceived(e) => &e.station_code,
            Event::AuthorizationResult(e) => &e.station_code,
            Event::TransactionStarted(e) => &e.station_code,
            Event::TransactionCompleted(e) => &e.station_code,
            Event::MeterSample(e) => &e.station_code,
            Event::CommandCompleted(e) => &e.station_code,
            Event::CommandTimedOut(e) => &e.station_code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConnectedEvent {
    pub station_code: String,
    pub remote_addr: Option<String>,
    /// Set when this connection replaced an older one for the same code.
    pub replaced_previous: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationDisconnectedEvent {
    pub station_code: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationStatusChangedEvent {
    pub station_code: String,
    pub connector_id: Option<u32>,
    /// Status as reported by the station, when it came from a status report
    pub reported_status: Option<String>,
    pub status: String,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootNotificationEvent {
    pub station_code: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatEvent {
    pub station_code: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationEvent {
    pub station_code: String,
    pub id_tag: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStartedEvent {
    pub station_code: String,
    pub connector_id: u32,
    pub transaction_id: i32,
    pub transaction_code: String,
    pub external_transaction_id: i32,
    pub user_id: i32,
    pub meter_start_kwh: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCompletedEvent {
    pub station_code: String,
    pub transaction_id: i32,
    pub external_transaction_id: i32,
    pub energy_kwh: String,
    pub solar_cost: String,
    pub pea_cost: String,
    pub total_cost: String,
    pub stop_reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterSampleEvent {
    pub station_code: String,
    pub connector_id: u32,
    pub transaction_id: Option<i32>,
    pub measurand: String,
    pub value: String,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandCompletedEvent {
    pub station_code: String,
    pub message_id: String,
    pub action: String,
    pub success: bool,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTimedOutEvent {
    pub station_code: String,
    pub message_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Envelope delivered to bus subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let message = EventMessage::new(Event::HeartbeatReceived(HeartbeatEvent {
            station_code: "ST-001".into(),
            timestamp: Utc::now(),
        }));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "HeartbeatReceived");
        assert_eq!(json["data"]["station_code"], "ST-001");
        assert!(json["id"].is_string());
        assert_eq!(message.event.event_type(), "heartbeat_received");
    }
}
