//! Reset command

use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::types::{ResetRequestStatus, ResetResponseStatus};
use serde_json::Value;
use tracing::info;

use super::{CommandError, IssuedCommand, SharedCommandSender};

/// Reset type for the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Restart without power cycle
    Soft,
    /// Full power cycle
    Hard,
}

impl From<ResetKind> for ResetRequestStatus {
    fn from(kind: ResetKind) -> Self {
        match kind {
            ResetKind::Soft => ResetRequestStatus::Soft,
            ResetKind::Hard => ResetRequestStatus::Hard,
        }
    }
}

pub async fn reset(
    command_sender: &SharedCommandSender,
    station_code: &str,
    reset_type: ResetKind,
) -> Result<IssuedCommand, CommandError> {
    info!(station_code, ?reset_type, "Reset");

    let request = ResetRequest {
        kind: reset_type.into(),
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    command_sender.send_command(station_code, "Reset", payload).await
}

pub fn parse_response(payload: Value) -> Result<ResetResponseStatus, CommandError> {
    let response: ResetResponse = serde_json::from_value(payload)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
    Ok(response.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::tests::{harness, next_frame};
    use crate::shared::OcppFrame;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn sends_reset_type() {
        let h = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = reset(&h.sender, "ST-001", ResetKind::Hard).await.unwrap();
        match next_frame(&mut rx) {
            OcppFrame::Call { action, payload, .. } => {
                assert_eq!(action, "Reset");
                assert_eq!(payload, json!({"type": "Hard"}));
            }
            other => panic!("expected Call, got {other:?}"),
        }

        h.sender
            .handle_response("ST-001", &issued.message_id.clone(), json!({"status": "Rejected"}));
        let status = parse_response(issued.wait().await.unwrap()).unwrap();
        assert!(matches!(status, ResetResponseStatus::Rejected));
    }

    #[tokio::test]
    async fn disconnected_station_is_reported() {
        let h = harness();
        let err = reset(&h.sender, "ST-001", ResetKind::Soft).await.unwrap_err();
        assert_eq!(err, CommandError::StationNotConnected("ST-001".into()));
    }
}
