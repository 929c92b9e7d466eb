//! UnlockConnector command

use rust_ocpp::v1_6::messages::unlock_connector::{
    UnlockConnectorRequest, UnlockConnectorResponse,
};
use rust_ocpp::v1_6::types::UnlockStatus;
use serde_json::Value;
use tracing::info;

use super::{CommandError, IssuedCommand, SharedCommandSender, DEFAULT_CONNECTOR_ID};

pub async fn unlock_connector(
    command_sender: &SharedCommandSender,
    station_code: &str,
    connector_id: Option<u32>,
) -> Result<IssuedCommand, CommandError> {
    let connector_id = connector_id.unwrap_or(DEFAULT_CONNECTOR_ID);
    info!(station_code, connector_id, "UnlockConnector");

    let request = UnlockConnectorRequest { connector_id };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    command_sender
        .send_command(station_code, "UnlockConnector", payload)
        .await
}

pub fn parse_response(payload: Value) -> Result<UnlockStatus, CommandError> {
    let response: UnlockConnectorResponse = serde_json::from_value(payload)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
    Ok(response.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::tests::{harness, next_frame};
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn unlocks_connector_one_by_default() {
        let h = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        unlock_connector(&h.sender, "ST-001", None).await.unwrap();
        let frame = next_frame(&mut rx);
        assert_eq!(frame.action(), Some("UnlockConnector"));
        if let crate::shared::OcppFrame::Call { payload, .. } = frame {
            assert_eq!(payload, json!({"connectorId": 1}));
        }
    }
}
