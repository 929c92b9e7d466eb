//! StartTransaction handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::start_transaction::StartTransactionResponse;
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use super::types::StartTransactionPayload;
use super::{parse_payload, to_payload, Action, HandlerResult};
use crate::application::handlers::OcppHandler;
use crate::application::services::{StartOutcome, StartRequest};

pub async fn handle_start_transaction(handler: &OcppHandler, payload: &Value) -> HandlerResult {
    let req: StartTransactionPayload = parse_payload(Action::StartTransaction, payload)?;

    info!(
        station_code = handler.station_code.as_str(),
        connector_id = req.connector_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    let outcome = handler
        .services
        .charging
        .start(
            &handler.station_code,
            StartRequest {
                connector_id: req.connector_id,
                id_tag: req.id_tag,
                meter_start_wh: req.meter_start,
                timestamp: req.timestamp.unwrap_or_else(Utc::now),
            },
        )
        .await;

    // Rejected starts carry transaction id 0, which the station never reuses.
    let (status, transaction_id) = match outcome {
        StartOutcome::Accepted { transaction_id, .. } => {
            (AuthorizationStatus::Accepted, transaction_id)
        }
        StartOutcome::Invalid => (AuthorizationStatus::Invalid, 0),
        StartOutcome::Blocked => (AuthorizationStatus::Blocked, 0),
    };

    to_payload(&StartTransactionResponse {
        id_tag_info: IdTagInfo {
            status,
            expiry_date: None,
            parent_id_tag: None,
        },
        transaction_id,
    })
}
