//! OCPP 1.6 action handlers
//!
//! Routes the supported station-initiated actions to their handlers.
//! Payloads are deserialized inside each handler, into `rust_ocpp::v1_6`
//! types where they fit and into [`types`] where the gateway needs wider
//! fields or lenient status strings.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::application::handlers::OcppHandler;
use crate::domain::DomainError;
use crate::shared::ErrorCode;

mod handle_authorize;
mod handle_boot_notification;
mod handle_heartbeat;
mod handle_meter_values;
mod handle_start_transaction;
mod handle_status_notification;
mod handle_stop_transaction;
pub mod types;

pub use handle_authorize::handle_authorize;
pub use handle_boot_notification::handle_boot_notification;
pub use handle_heartbeat::handle_heartbeat;
pub use handle_meter_values::handle_meter_values;
pub use handle_start_transaction::handle_start_transaction;
pub use handle_status_notification::handle_status_notification;
pub use handle_stop_transaction::handle_stop_transaction;

/// Station-initiated actions the gateway answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Authorize,
    BootNotification,
    Heartbeat,
    MeterValues,
    StartTransaction,
    StatusNotification,
    StopTransaction,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "Authorize",
            Self::BootNotification => "BootNotification",
            Self::Heartbeat => "Heartbeat",
            Self::MeterValues => "MeterValues",
            Self::StartTransaction => "StartTransaction",
            Self::StatusNotification => "StatusNotification",
            Self::StopTransaction => "StopTransaction",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Action {0} not supported")]
pub struct UnsupportedAction(pub String);

impl FromStr for Action {
    type Err = UnsupportedAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Authorize" => Ok(Self::Authorize),
            "BootNotification" => Ok(Self::BootNotification),
            "Heartbeat" => Ok(Self::Heartbeat),
            "MeterValues" => Ok(Self::MeterValues),
            "StartTransaction" => Ok(Self::StartTransaction),
            "StatusNotification" => Ok(Self::StatusNotification),
            "StopTransaction" => Ok(Self::StopTransaction),
            other => Err(UnsupportedAction(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid {action} payload: {source}")]
    InvalidPayload {
        action: Action,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl HandlerError {
    /// Error code sent back in the CallError frame.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidPayload { .. } => ErrorCode::FormatError,
            Self::Domain(_) | Self::Encode(_) => ErrorCode::InternalError,
        }
    }
}

pub type HandlerResult = Result<Value, HandlerError>;

pub(crate) fn parse_payload<T: DeserializeOwned>(
    action: Action,
    payload: &Value,
) -> Result<T, HandlerError> {
    serde_json::from_value(payload.clone())
        .map_err(|source| HandlerError::InvalidPayload { action, source })
}

pub(crate) fn to_payload<T: Serialize>(response: &T) -> HandlerResult {
    serde_json::to_value(response).map_err(HandlerError::Encode)
}

/// Routes an action to its handler.
pub async fn action_matcher(handler: &OcppHandler, action: Action, payload: &Value) -> HandlerResult {
    match action {
        Action::Authorize => handle_authorize(handler, payload).await,
        Action::BootNotification => handle_boot_notification(handler, payload).await,
        Action::Heartbeat => handle_heartbeat(handler, payload).await,
        Action::MeterValues => handle_meter_values(handler, payload).await,
        Action::StartTransaction => handle_start_transaction(handler, payload).await,
        Action::StatusNotification => handle_status_notification(handler, payload).await,
        Action::StopTransaction => handle_stop_transaction(handler, payload).await,
    }
}
