//! RemoteStartTransaction command

use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use rust_ocpp::v1_6::types::RemoteStartStopStatus;
use serde_json::Value;
use tracing::info;

use super::{CommandError, IssuedCommand, SharedCommandSender};

/// Connector used when the caller does not name one.
pub const DEFAULT_CONNECTOR_ID: u32 = 1;

pub async fn remote_start_transaction(
    command_sender: &SharedCommandSender,
    station_code: &str,
    id_tag: &str,
    connector_id: Option<u32>,
) -> Result<IssuedCommand, CommandError> {
    let connector_id = connector_id.unwrap_or(DEFAULT_CONNECTOR_ID);
    info!(station_code, id_tag, connector_id, "RemoteStartTransaction");

    let request = RemoteStartTransactionRequest {
        connector_id: Some(connector_id),
        id_tag: id_tag.to_string(),
        charging_profile: None,
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    command_sender
        .send_command(station_code, "RemoteStartTransaction", payload)
        .await
}

/// Interpret the station's answer.
pub fn parse_response(payload: Value) -> Result<RemoteStartStopStatus, CommandError> {
    let response: RemoteStartTransactionResponse = serde_json::from_value(payload)
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
    async fn defaults_to_connector_one() {
        let h = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        let issued = remote_start_transaction(&h.sender, "ST-001", "42", None)
            .await
            .unwrap();

        match next_frame(&mut rx) {
            OcppFrame::Call { action, payload, .. } => {
                assert_eq!(action, "RemoteStartTransaction");
                assert_eq!(payload["connectorId"], 1);
                assert_eq!(payload["idTag"], "42");
            }
            other => panic!("expected Call, got {other:?}"),
        }

        h.sender
            .handle_response("ST-001", &issued.message_id.clone(), json!({"status": "Accepted"}));
        let status = parse_response(issued.wait().await.unwrap()).unwrap();
        assert!(matches!(status, RemoteStartStopStatus::Accepted));
    }
}
