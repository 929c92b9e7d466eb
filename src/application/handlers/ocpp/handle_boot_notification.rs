//! BootNotification handler

use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::info;

use super::{parse_payload, to_payload, Action, HandlerResult};
use crate::application::handlers::OcppHandler;
use crate::domain::StationInfo;

pub async fn handle_boot_notification(handler: &OcppHandler, payload: &Value) -> HandlerResult {
    let req: BootNotificationRequest = parse_payload(Action::BootNotification, payload)?;

    info!(
        station_code = handler.station_code.as_str(),
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        "BootNotification"
    );

    let info = StationInfo {
        vendor: req.charge_point_vendor,
        model: req.charge_point_model,
        serial_number: req.charge_point_serial_number,
        firmware_version: req.firmware_version,
    };
    let current_time = handler.services.stations.boot(&handler.station_code, info).await?;

    to_payload(&BootNotificationResponse {
        current_time,
        interval: handler.services.heartbeat_interval as _,
        status: RegistrationStatus::Accepted,
    })
}
