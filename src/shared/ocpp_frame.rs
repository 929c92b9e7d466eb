//! OCPP-J message framing
//!
//! Every message exchanged with a station is a JSON array:
//!
//! - **Call**       `[2, "<messageId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<messageId>", {<payload>}]`
//! - **CallError**  `[4, "<messageId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Trailing elements are optional where a sensible default exists: a Call
//! without payload carries `{}`, a CallError without description carries `""`.

use serde_json::Value;
use thiserror::Error;

// ── Message-type constants ─────────────────────────────────────

pub const MSG_TYPE_CALL: u64 = 2;
pub const MSG_TYPE_CALL_RESULT: u64 = 3;
pub const MSG_TYPE_CALL_ERROR: u64 = 4;

// ── Error codes ────────────────────────────────────────────────

/// Error codes the gateway itself emits in CallError frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The envelope could not be decoded, or its payload does not match the action.
    FormatError,
    /// The action is not part of the supported inbound set.
    NotSupported,
    /// The handler failed while processing an otherwise valid request.
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormatError => "FormatError",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── OcppFrame ──────────────────────────────────────────────────

/// A decoded OCPP-J envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    /// `[2, messageId, action, payload]`
    Call {
        message_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, messageId, payload]`
    CallResult { message_id: String, payload: Value },
    /// `[4, messageId, errorCode, errorDescription, errorDetails]`
    CallError {
        message_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    // ── Decoding ───────────────────────────────────────────

    /// Decode raw text into a frame.
    ///
    /// Fails unless the text is a JSON array of at least three elements
    /// whose first element is one of the three message-type tags.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
        let arr = value.as_array().ok_or(FrameError::NotAnArray)?;

        if arr.len() < 3 {
            return Err(FrameError::MissingFields { got: arr.len() });
        }

        let msg_type = arr[0].as_u64().ok_or(FrameError::InvalidMessageType)?;
        let message_id = message_id_of(&arr[1]).ok_or(FrameError::InvalidMessageId)?;

        match msg_type {
            MSG_TYPE_CALL => {
                let action = arr[2]
                    .as_str()
                    .ok_or(FrameError::FieldTypeMismatch("action must be a string"))?
                    .to_string();
                let payload = arr.get(3).cloned().unwrap_or_else(empty_object);
                Ok(Self::Call {
                    message_id,
                    action,
                    payload,
                })
            }
            MSG_TYPE_CALL_RESULT => Ok(Self::CallResult {
                message_id,
                payload: arr[2].clone(),
            }),
            MSG_TYPE_CALL_ERROR => {
                let error_code = arr[2]
                    .as_str()
                    .ok_or(FrameError::FieldTypeMismatch("errorCode must be a string"))?
                    .to_string();
                let error_description = arr
                    .get(3)
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let error_details = arr.get(4).cloned().unwrap_or_else(empty_object);
                Ok(Self::CallError {
                    message_id,
                    error_code,
                    error_description,
                    error_details,
                })
            }
            other => Err(FrameError::UnknownMessageType(other)),
        }
    }

    /// Best-effort extraction of the message id from text that failed to decode,
    /// so the FormatError reply can still be correlated by the sender.
    pub fn recover_message_id(text: &str) -> Option<String> {
        let value: Value = serde_json::from_str(text).ok()?;
        value.as_array()?.get(1).and_then(message_id_of)
    }

    // ── Encoding ───────────────────────────────────────────

    /// Encode this frame as JSON text.
    pub fn serialize(&self) -> String {
        let arr = match self {
            Self::Call {
                message_id,
                action,
                payload,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL),
                Value::String(message_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),
            Self::CallResult {
                message_id,
                payload,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL_RESULT),
                Value::String(message_id.clone()),
                payload.clone(),
            ]),
            Self::CallError {
                message_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::from(MSG_TYPE_CALL_ERROR),
                Value::String(message_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ]),
        };
        arr.to_string()
    }

    // ── Helpers ────────────────────────────────────────────

    pub fn message_id(&self) -> &str {
        match self {
            Self::Call { message_id, .. }
            | Self::CallResult { message_id, .. }
            | Self::CallError { message_id, .. } => message_id,
        }
    }

    /// Action name for Call frames.
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Call { action, .. } => Some(action),
            _ => None,
        }
    }

    /// Short label used in logs and the audit trail.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Call { .. } => "Call",
            Self::CallResult { .. } => "CallResult",
            Self::CallError { .. } => "CallError",
        }
    }

    pub fn result(message_id: impl Into<String>, payload: Value) -> Self {
        Self::CallResult {
            message_id: message_id.into(),
            payload,
        }
    }

    pub fn error_response(
        message_id: impl Into<String>,
        error_code: ErrorCode,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            message_id: message_id.into(),
            error_code: error_code.as_str().to_string(),
            error_description: error_description.into(),
            error_details: empty_object(),
        }
    }
}

fn message_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

// ── Errors ─────────────────────────────────────────────────────

/// Reasons a raw message cannot be decoded. All of them surface to the
/// station as a `FormatError`.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Message is not a JSON array")]
    NotAnArray,

    #[error("Expected at least 3 fields, got {got}")]
    MissingFields { got: usize },

    #[error("Message type is not a number")]
    InvalidMessageType,

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),

    #[error("Message id must be a string")]
    InvalidMessageId,

    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(&'static str),
}
