//! Authorize handler

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;

use super::{parse_payload, to_payload, Action, HandlerResult};
use crate::application::handlers::OcppHandler;
use crate::application::services::AuthorizeOutcome;

pub async fn handle_authorize(handler: &OcppHandler, payload: &Value) -> HandlerResult {
    let req: AuthorizeRequest = parse_payload(Action::Authorize, payload)?;

    let outcome = handler
        .services
        .charging
        .authorize(&handler.station_code, &req.id_tag)
        .await?;

    let status = match outcome {
        AuthorizeOutcome::Accepted => AuthorizationStatus::Accepted,
        AuthorizeOutcome::Invalid => AuthorizationStatus::Invalid,
    };

    to_payload(&AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status,
            expiry_date: None,
            parent_id_tag: None,
        },
    })
}
