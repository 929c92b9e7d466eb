//! OCPP message handlers

pub mod ocpp;
mod ocpp_handler;

pub use ocpp::{Action, HandlerError, UnsupportedAction};
pub use ocpp_handler::{GatewayServices, OcppHandler};
