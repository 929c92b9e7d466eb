//! Command sender for gateway-to-station requests
//!
//! Sends OCPP Call frames to connected stations and completes them when the
//! matching CallResult or CallError arrives, the request expires, or the
//! station disconnects. Callers get an [`IssuedCommand`] back immediately.

pub mod remote_start;
pub mod remote_stop;
pub mod reset;
pub mod unlock_connector;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::events::{
    CommandCompletedEvent, CommandTimedOutEvent, Event, SharedEventBus,
};
use crate::application::session::SharedSessionRegistry;
use crate::domain::audit::{AuditEntry, AuditLogger, Direction};
use crate::shared::{OcppFrame, ShutdownSignal};

pub use remote_start::{remote_start_transaction, DEFAULT_CONNECTOR_ID};
pub use remote_stop::remote_stop_transaction;
pub use reset::{reset, ResetKind};
pub use unlock_connector::unlock_connector;

/// How often the reaper looks for expired requests
const REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Command sender errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("Station {0} is not connected")]
    StationNotConnected(String),

    #[error("Failed to send: {0}")]
    SendFailed(String),

    #[error("Response timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("CallError {code}: {description}")]
    CallError { code: String, description: String },
}

/// Pending request waiting for a response
struct PendingRequest {
    action: String,
    deadline: Instant,
    response_sender: oneshot::Sender<Result<Value, CommandError>>,
}

/// A request that has been written to the station's connection.
#[derive(Debug)]
pub struct IssuedCommand {
    pub message_id: String,
    pub action: String,
    outcome: oneshot::Receiver<Result<Value, CommandError>>,
}

impl IssuedCommand {
    /// Wait for the station's answer. Resolves with `Timeout` once the
    /// request expires.
    pub async fn wait(self) -> Result<Value, CommandError> {
        self.outcome
            .await
            .unwrap_or_else(|_| Err(CommandError::InvalidResponse("request dropped".into())))
    }
}

/// Command sender for sending OCPP commands to stations
pub struct CommandSender {
    sessions: SharedSessionRegistry,
    audit: Arc<dyn AuditLogger>,
    event_bus: SharedEventBus,
    response_timeout: Duration,
    /// Pending requests indexed by (station_code, message_id)
    pending_requests: DashMap<(String, String), PendingRequest>,
}

impl CommandSender {
    pub fn new(
        sessions: SharedSessionRegistry,
        audit: Arc<dyn AuditLogger>,
        event_bus: SharedEventBus,
        response_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            audit,
            event_bus,
            response_timeout,
            pending_requests: DashMap::new(),
        }
    }

    /// Send `[2, id, action, payload]` to a station. Nothing is sent or
    /// registered when the station has no live connection.
    pub async fn send_command(
        &self,
        station_code: &str,
        action: &str,
        payload: Value,
    ) -> Result<IssuedCommand, CommandError> {
        if !self.sessions.is_connected(station_code) {
            return Err(CommandError::StationNotConnected(station_code.to_string()));
        }

        let message_id = Uuid::new_v4().to_string();
        let frame = OcppFrame::Call {
            message_id: message_id.clone(),
            action: action.to_string(),
            payload,
        };
        let text = frame.serialize();

        let (tx, rx) = oneshot::channel();
        let key = (station_code.to_string(), message_id.clone());
        self.pending_requests.insert(
            key.clone(),
            PendingRequest {
                action: action.to_string(),
                deadline: Instant::now() + self.response_timeout,
                response_sender: tx,
            },
        );

        if let Err(e) = self.sessions.send_to(station_code, text.clone()) {
            self.pending_requests.remove(&key);
            warn!(station_code, action, error = %e, "Failed to queue command");
            return Err(CommandError::StationNotConnected(station_code.to_string()));
        }

        info!(station_code, action, message_id = message_id.as_str(), "Command sent");
        metrics::counter!("gateway_commands_sent_total", "action" => action.to_string())
            .increment(1);

        self.audit
            .record_best_effort(AuditEntry {
                station_code: station_code.to_string(),
                direction: Direction::Outgoing,
                message_type: frame.kind().to_string(),
                action: Some(action.to_string()),
                message_id: Some(message_id.clone()),
                payload: text,
            })
            .await;

        Ok(IssuedCommand {
            message_id,
            action: action.to_string(),
            outcome: rx,
        })
    }

    /// Complete a pending request with the station's CallResult.
    /// Returns `false` if nothing was waiting for this id.
    pub fn handle_response(&self, station_code: &str, message_id: &str, payload: Value) -> bool {
        let key = (station_code.to_string(), message_id.to_string());

        let Some((_, pending)) = self.pending_requests.remove(&key) else {
            warn!(station_code, message_id, "Received response for unknown request");
            return false;
        };

        info!(
            station_code,
            message_id,
            action = pending.action.as_str(),
            "Received command response"
        );
        self.publish_completed(station_code, message_id, &pending.action, None);
        let _ = pending.response_sender.send(Ok(payload));
        true
    }

    /// Complete a pending request with the station's CallError.
    pub fn handle_error(
        &self,
        station_code: &str,
        message_id: &str,
        error_code: &str,
        error_description: &str,
    ) -> bool {
        let key = (station_code.to_string(), message_id.to_string());

        let Some((_, pending)) = self.pending_requests.remove(&key) else {
            warn!(station_code, message_id, error_code, "Received error for unknown request");
            return false;
        };

        warn!(
            station_code,
            message_id,
            action = pending.action.as_str(),
            error_code,
            error_description,
            "Command rejected by station"
        );
        self.publish_completed(station_code, message_id, &pending.action, Some(error_code));
        let _ = pending.response_sender.send(Err(CommandError::CallError {
            code: error_code.to_string(),
            description: error_description.to_string(),
        }));
        true
    }

    /// Fail every request pending on a station that went away.
    pub fn cleanup_station(&self, station_code: &str) -> usize {
        let keys: Vec<_> = self
            .pending_requests
            .iter()
            .filter(|entry| entry.key().0 == station_code)
            .map(|entry| entry.key().clone())
            .collect();

        let mut failed = 0;
        for key in keys {
            if let Some((_, pending)) = self.pending_requests.remove(&key) {
                let _ = pending
                    .response_sender
                    .send(Err(CommandError::StationNotConnected(station_code.to_string())));
                failed += 1;
            }
        }
        if failed > 0 {
            debug!(station_code, failed, "Failed pending commands of disconnected station");
        }
        failed
    }

    /// Expire every request whose deadline is at or before `now`.
    pub fn reap_expired_at(&self, now: Instant) -> usize {
        let expired: Vec<_> = self
            .pending_requests
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| entry.key().clone())
            .collect();

        let mut reaped = 0;
        for key in expired {
            let Some(((station_code, message_id), pending)) = self.pending_requests.remove(&key)
            else {
                continue;
            };
            warn!(
                station_code = station_code.as_str(),
                message_id = message_id.as_str(),
                action = pending.action.as_str(),
                "Command timed out"
            );
            metrics::counter!("gateway_command_timeouts_total", "action" => pending.action.clone())
                .increment(1);
            self.event_bus
                .publish(Event::CommandTimedOut(CommandTimedOutEvent {
                    station_code,
                    message_id,
                    action: pending.action,
                    timestamp: Utc::now(),
                }));
            let _ = pending.response_sender.send(Err(CommandError::Timeout));
            reaped += 1;
        }
        reaped
    }

    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    /// Background task expiring requests until shutdown.
    pub fn spawn_reaper(self: &Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let sender = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAP_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sender.reap_expired_at(Instant::now());
                    }
                    _ = shutdown.wait() => {
                        debug!("Command reaper stopping");
                        break;
                    }
                }
            }
        })
    }

    fn publish_completed(
        &self,
        station_code: &str,
        message_id: &str,
        action: &str,
        error_code: Option<&str>,
    ) {
        self.event_bus
            .publish(Event::CommandCompleted(CommandCompletedEvent {
                station_code: station_code.to_string(),
                message_id: message_id.to_string(),
                action: action.to_string(),
                success: error_code.is_none(),
                error_code: error_code.map(str::to_string),
                timestamp: Utc::now(),
            }));
    }
}

/// Thread-safe command sender
pub type SharedCommandSender = Arc<CommandSender>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::events::EventBus;
    use crate::application::session::{Outbound, SessionRegistry};
    use crate::test_support::RecordingAuditLogger;
    use serde_json::json;
    use tokio::sync::mpsc;

    pub(crate) struct Harness {
        pub sender: SharedCommandSender,
        pub sessions: SharedSessionRegistry,
        pub audit: Arc<RecordingAuditLogger>,
        pub bus: SharedEventBus,
    }

    pub(crate) fn harness() -> Harness {
        let sessions = SessionRegistry::shared();
        let audit = Arc::new(RecordingAuditLogger::default());
        let bus = Arc::new(EventBus::new());
        let sender = Arc::new(CommandSender::new(
            sessions.clone(),
            audit.clone(),
            bus.clone(),
            Duration::from_secs(30),
        ));
        Harness {
            sender,
            sessions,
            audit,
            bus,
        }
    }

    /// Decode the next frame queued for a station.
    pub(crate) fn next_frame(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> OcppFrame {
        match rx.try_recv().expect("frame queued") {
            Outbound::Frame(text) => OcppFrame::parse(&text).unwrap(),
            Outbound::Close => panic!("unexpected close"),
        }
    }

    #[tokio::test]
    async fn disconnected_station_gets_nothing() {
        let h = harness();
        let err = h
            .sender
            .send_command("ST-404", "Reset", json!({"type": "Soft"}))
            .await
            .unwrap_err();
        assert_eq!(err, CommandError::StationNotConnected("ST-404".into()));
        assert_eq!(h.sender.pending_count(), 0);
        assert!(h.audit.entries().is_empty());
    }

    #[tokio::test]
    async fn response_completes_pending_request() {
        let h = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = h
            .sender
            .send_command("ST-001", "Reset", json!({"type": "Soft"}))
            .await
            .unwrap();
        let frame = next_frame(&mut rx);
        assert_eq!(frame.message_id(), issued.message_id);
        assert_eq!(frame.action(), Some("Reset"));
        assert!(Uuid::parse_str(&issued.message_id).is_ok());

        let audit = h.audit.entries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].direction, Direction::Outgoing);

        let id = issued.message_id.clone();
        assert!(h.sender.handle_response("ST-001", &id, json!({"status": "Accepted"})));
        assert_eq!(issued.wait().await.unwrap(), json!({"status": "Accepted"}));
        assert_eq!(h.sender.pending_count(), 0);
        assert!(!h.sender.handle_response("ST-001", &id, json!({})));
    }

    #[tokio::test]
    async fn responses_are_matched_per_station() {
        let h = harness();
        let (tx, _rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = h
            .sender
            .send_command("ST-001", "Reset", json!({"type": "Hard"}))
            .await
            .unwrap();
        assert!(!h.sender.handle_response("ST-002", &issued.message_id, json!({})));
        assert_eq!(h.sender.pending_count(), 1);
    }

    #[tokio::test]
    async fn call_error_fails_request() {
        let h = harness();
        let (tx, _rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = h
            .sender
            .send_command("ST-001", "UnlockConnector", json!({"connectorId": 1}))
            .await
            .unwrap();
        let id = issued.message_id.clone();
        h.sender.handle_error("ST-001", &id, "NotImplemented", "nope");

        assert_eq!(
            issued.wait().await.unwrap_err(),
            CommandError::CallError {
                code: "NotImplemented".into(),
                description: "nope".into()
            }
        );
    }

    #[tokio::test]
    async fn expired_requests_time_out_and_notify() {
        let h = harness();
        let mut events = h.bus.subscribe();
        let (tx, _rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = h
            .sender
            .send_command("ST-001", "Reset", json!({"type": "Soft"}))
            .await
            .unwrap();

        assert_eq!(h.sender.reap_expired_at(Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(31);
        assert_eq!(h.sender.reap_expired_at(later), 1);

        assert_eq!(issued.wait().await.unwrap_err(), CommandError::Timeout);
        let event = events.try_recv().unwrap();
        assert_eq!(event.event.event_type(), "command_timed_out");
    }

    #[tokio::test]
    async fn disconnect_fails_pending_requests() {
        let h = harness();
        let (tx, _rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = h
            .sender
            .send_command("ST-001", "Reset", json!({"type": "Soft"}))
            .await
            .unwrap();
        assert_eq!(h.sender.cleanup_station("ST-001"), 1);
        assert_eq!(
            issued.wait().await.unwrap_err(),
            CommandError::StationNotConnected("ST-001".into())
        );
    }
}
