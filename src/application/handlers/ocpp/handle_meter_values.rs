//! MeterValues handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::meter_values::MeterValuesResponse;
use serde_json::Value;
use tracing::debug;

use super::types::MeterValuesPayload;
use super::{parse_payload, to_payload, Action, HandlerResult};
use crate::application::events::{Event, MeterSampleEvent};
use crate::application::handlers::OcppHandler;

pub async fn handle_meter_values(handler: &OcppHandler, payload: &Value) -> HandlerResult {
    let req: MeterValuesPayload = parse_payload(Action::MeterValues, payload)?;

    debug!(
        station_code = handler.station_code.as_str(),
        connector_id = req.connector_id,
        transaction_id = ?req.transaction_id,
        samples = req.meter_value.len(),
        "MeterValues"
    );

    for meter_value in &req.meter_value {
        let timestamp = meter_value.timestamp.unwrap_or_else(Utc::now);
        for sampled in &meter_value.sampled_value {
            handler
                .services
                .event_bus
                .publish(Event::MeterSample(MeterSampleEvent {
                    station_code: handler.station_code.clone(),
                    connector_id: req.connector_id,
                    transaction_id: req.transaction_id,
                    measurand: sampled.measurand_or_default().to_string(),
                    value: sampled.value.clone(),
                    unit: sampled.unit_or_default().to_string(),
                    timestamp,
                }));
        }
    }

    to_payload(&MeterValuesResponse {})
}
