//! RemoteStopTransaction command

use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use rust_ocpp::v1_6::types::RemoteStartStopStatus;
use serde_json::Value;
use tracing::info;

use super::{CommandError, IssuedCommand, SharedCommandSender};

pub async fn remote_stop_transaction(
    command_sender: &SharedCommandSender,
    station_code: &str,
    transaction_id: i32,
) -> Result<IssuedCommand, CommandError> {
    info!(station_code, transaction_id, "RemoteStopTransaction");

    let payload = serde_json::to_value(RemoteStopTransactionRequest { transaction_id })
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    command_sender
        .send_command(station_code, "RemoteStopTransaction", payload)
        .await
}

pub fn parse_response(payload: Value) -> Result<RemoteStartStopStatus, CommandError> {
    let response: RemoteStopTransactionResponse = serde_json::from_value(payload)
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
    async fn carries_external_transaction_id() {
        let h = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.sessions.attach("ST-001", tx, None);

        remote_stop_transaction(&h.sender, "ST-001", 42)
            .await
            .unwrap();

        match next_frame(&mut rx) {
            OcppFrame::Call { action, payload, .. } => {
                assert_eq!(action, "RemoteStopTransaction");
                assert_eq!(payload, json!({"transactionId": 42}));
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn rejects_garbled_response() {
        assert!(matches!(
            parse_response(json!({"state": "ok"})),
            Err(CommandError::InvalidResponse(_))
        ));
    }
}
