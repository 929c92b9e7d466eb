//! StopTransaction handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::stop_transaction::StopTransactionResponse;
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use super::types::StopTransactionPayload;
use super::{parse_payload, to_payload, Action, HandlerResult};
use crate::application::handlers::OcppHandler;
use crate::application::services::{StopOutcome, StopRequest};

pub async fn handle_stop_transaction(handler: &OcppHandler, payload: &Value) -> HandlerResult {
    let req: StopTransactionPayload = parse_payload(Action::StopTransaction, payload)?;

    info!(
        station_code = handler.station_code.as_str(),
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        reason = ?req.reason,
        "StopTransaction"
    );

    let outcome = handler
        .services
        .charging
        .stop(
            &handler.station_code,
            StopRequest {
                transaction_id: req.transaction_id,
                meter_stop_wh: req.meter_stop,
                timestamp: req.timestamp.unwrap_or_else(Utc::now),
                reason: req.reason,
            },
        )
        .await;

    let status = match outcome {
        StopOutcome::Accepted => AuthorizationStatus::Accepted,
        StopOutcome::Invalid => AuthorizationStatus::Invalid,
        StopOutcome::Blocked => AuthorizationStatus::Blocked,
    };

    to_payload(&StopTransactionResponse {
        id_tag_info: Some(IdTagInfo {
            status,
            expiry_date: None,
            parent_id_tag: None,
        }),
    })
}
