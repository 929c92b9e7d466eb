//! Heartbeat handler

use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::debug;

use super::{to_payload, HandlerResult};
use crate::application::handlers::OcppHandler;

pub async fn handle_heartbeat(handler: &OcppHandler, _payload: &Value) -> HandlerResult {
    debug!(station_code = handler.station_code.as_str(), "Heartbeat");

    let current_time = handler.services.stations.heartbeat(&handler.station_code).await?;

    to_payload(&HeartbeatResponse { current_time })
}
