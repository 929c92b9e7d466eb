//! StatusNotification handler

use rust_ocpp::v1_6::messages::status_notification::StatusNotificationResponse;
use serde_json::Value;
use tracing::info;

use super::types::StatusNotificationPayload;
use super::{parse_payload, to_payload, Action, HandlerResult};
use crate::application::handlers::OcppHandler;
use crate::application::services::StatusReport;

pub async fn handle_status_notification(handler: &OcppHandler, payload: &Value) -> HandlerResult {
    let req: StatusNotificationPayload = parse_payload(Action::StatusNotification, payload)?;

    info!(
        station_code = handler.station_code.as_str(),
        connector_id = req.connector_id,
        status = req.status.as_str(),
        error_code = ?req.error_code,
        "StatusNotification"
    );

    handler
        .services
        .stations
        .status_notification(
            &handler.station_code,
            StatusReport {
                connector_id: req.connector_id,
                status: req.status,
                error_code: req.error_code,
            },
        )
        .await?;

    to_payload(&StatusNotificationResponse {})
}
