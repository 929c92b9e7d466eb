//! Payloads the gateway models itself
//!
//! Stations in the field omit timestamps and send status and reason values
//! outside the published enumerations, so these parse leniently: strings
//! stay strings and missing fields fall back to defaults.

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const DEFAULT_MEASURAND: &str = "Energy.Active.Import.Register";
pub const DEFAULT_UNIT: &str = "Wh";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTransactionPayload {
    pub connector_id: u32,
    pub id_tag: String,
    /// Wh
    pub meter_start: i64,
    #[serde(default)]
    pub reservation_id: Option<i32>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTransactionPayload {
    pub transaction_id: i32,
    /// Wh
    pub meter_stop: i64,
    #[serde(default)]
    pub id_tag: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNotificationPayload {
    pub connector_id: u32,
    #[serde(default)]
    pub error_code: Option<String>,
    pub status: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValuesPayload {
    pub connector_id: u32,
    #[serde(default)]
    pub transaction_id: Option<i32>,
    #[serde(default)]
    pub meter_value: Vec<MeterValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterValue {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sampled_value: Vec<SampledValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledValue {
    pub value: String,
    #[serde(default)]
    pub measurand: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
}

impl SampledValue {
    pub fn measurand_or_default(&self) -> &str {
        self.measurand.as_deref().unwrap_or(DEFAULT_MEASURAND)
    }

    pub fn unit_or_default(&self) -> &str {
        self.unit.as_deref().unwrap_or(DEFAULT_UNIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stop_accepts_free_form_reason_and_missing_timestamp() {
        let stop: StopTransactionPayload = serde_json::from_value(json!({
            "transactionId": 42,
            "meterStop": 12_000,
            "reason": "SomethingVendorSpecific"
        }))
        .unwrap();
        assert_eq!(stop.transaction_id, 42);
        assert!(stop.timestamp.is_none());
        assert_eq!(stop.reason.as_deref(), Some("SomethingVendorSpecific"));
    }

    #[test]
    fn rejects_transaction_ids_beyond_int32() {
        let result = serde_json::from_value::<StopTransactionPayload>(json!({
            "transactionId": 17_145_000_001_234_i64,
            "meterStop": 12_000
        }));
        assert!(result.is_err());
    }

    #[test]
    fn sampled_value_defaults() {
        let values: MeterValuesPayload = serde_json::from_value(json!({
            "connectorId": 1,
            "meterValue": [{
                "timestamp": "2024-05-01T10:00:00Z",
                "sampledValue": [{"value": "1500"}, {"value": "7.2", "measurand": "Power.Active.Import", "unit": "kW"}]
            }]
        }))
        .unwrap();
        let samples = &values.meter_value[0].sampled_value;
        assert_eq!(samples[0].measurand_or_default(), DEFAULT_MEASURAND);
        assert_eq!(samples[0].unit_or_default(), "Wh");
        assert_eq!(samples[1].unit_or_default(), "kW");
        assert!(values.transaction_id.is_none());
    }
}
