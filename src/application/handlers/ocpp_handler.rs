//! OCPP 1.6 message handler
//!
//! Decodes raw OCPP-J frames from one station, dispatches Calls to the
//! action handlers, routes CallResult/CallError to the command sender and
//! encodes the reply. Every frame in either direction goes to the audit log.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::application::commands::SharedCommandSender;
use crate::application::events::SharedEventBus;
use crate::application::handlers::ocpp::{action_matcher, Action};
use crate::application::services::{ChargingService, StationService};
use crate::domain::audit::{AuditEntry, AuditLogger, Direction};
use crate::shared::{ErrorCode, OcppFrame};

/// Services shared by every connection's handler.
pub struct GatewayServices {
    pub charging: Arc<ChargingService>,
    pub stations: Arc<StationService>,
    pub commands: SharedCommandSender,
    pub audit: Arc<dyn AuditLogger>,
    pub event_bus: SharedEventBus,
    /// Interval handed to stations in BootNotification, in seconds
    pub heartbeat_interval: u32,
}

/// Handler for the frames of one station connection
pub struct OcppHandler {
    pub station_code: String,
    pub services: Arc<GatewayServices>,
}

impl OcppHandler {
    pub fn new(station_code: impl Into<String>, services: Arc<GatewayServices>) -> Self {
        Self {
            station_code: station_code.into(),
            services,
        }
    }

    /// Handle one text frame. Returns the reply to send, if any.
    pub async fn handle(&self, text: &str) -> Option<String> {
        debug!(station_code = self.station_code.as_str(), raw = text, "Received frame");
        metrics::counter!("gateway_messages_total", "direction" => "incoming").increment(1);

        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                let message_id = OcppFrame::recover_message_id(text);
                warn!(
                    station_code = self.station_code.as_str(),
                    error = %e,
                    message_id = ?message_id,
                    "Malformed frame"
                );
                self.audit(Direction::Incoming, "Malformed", None, message_id.clone(), text)
                    .await;
                let reply = OcppFrame::error_response(
                    message_id.unwrap_or_default(),
                    ErrorCode::FormatError,
                    e.to_string(),
                );
                return Some(self.reply(reply).await);
            }
        };

        self.audit(
            Direction::Incoming,
            frame.kind(),
            frame.action().map(str::to_string),
            Some(frame.message_id().to_string()),
            text,
        )
        .await;

        match frame {
            OcppFrame::Call {
                message_id,
                action,
                payload,
            } => {
                let reply = self.handle_call(message_id, &action, payload).await;
                Some(self.reply(reply).await)
            }
            OcppFrame::CallResult {
                message_id,
                payload,
            } => {
                self.services
                    .commands
                    .handle_response(&self.station_code, &message_id, payload);
                None
            }
            OcppFrame::CallError {
                message_id,
                error_code,
                error_description,
                ..
            } => {
                self.services.commands.handle_error(
                    &self.station_code,
                    &message_id,
                    &error_code,
                    &error_description,
                );
                None
            }
        }
    }

    async fn handle_call(&self, message_id: String, action: &str, payload: Value) -> OcppFrame {
        let action = match action.parse::<Action>() {
            Ok(action) => action,
            Err(e) => {
                warn!(station_code = self.station_code.as_str(), action, "Unsupported action");
                return OcppFrame::error_response(message_id, ErrorCode::NotSupported, e.to_string());
            }
        };

        let outcome = AssertUnwindSafe(action_matcher(self, action, &payload))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => OcppFrame::result(message_id, result),
            Ok(Err(e)) => {
                let code = e.error_code();
                error!(
                    station_code = self.station_code.as_str(),
                    action = action.as_str(),
                    error = %e,
                    "Handler failed"
                );
                let description = match code {
                    ErrorCode::FormatError => e.to_string(),
                    _ => format!("Failed to process {action}"),
                };
                OcppFrame::error_response(message_id, code, description)
            }
            Err(_) => {
                error!(
                    station_code = self.station_code.as_str(),
                    action = action.as_str(),
                    "Handler panicked"
                );
                OcppFrame::error_response(
                    message_id,
                    ErrorCode::InternalError,
                    format!("Failed to process {action}"),
                )
            }
        }
    }

    async fn reply(&self, frame: OcppFrame) -> String {
        let text = frame.serialize();
        metrics::counter!("gateway_messages_total", "direction" => "outgoing").increment(1);
        self.audit(
            Direction::Outgoing,
            frame.kind(),
            None,
            Some(frame.message_id().to_string()),
            &text,
        )
        .await;
        text
    }

    async fn audit(
        &self,
        direction: Direction,
        message_type: &str,
        action: Option<String>,
        message_id: Option<String>,
        payload: &str,
    ) {
        self.services
            .audit
            .record_best_effort(AuditEntry {
                station_code: self.station_code.clone(),
                direction,
                message_type: message_type.to_string(),
                action,
                message_id,
                payload: payload.to_string(),
            })
            .await;
    }
}
