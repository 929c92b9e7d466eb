//! Station lifecycle: connection side effects, boot, heartbeat and status reports

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::application::events::{
    BootNotificationEvent, Event, HeartbeatEvent, SharedEventBus, StationConnectedEvent,
    StationDisconnectedEvent, StationStatusChangedEvent,
};
use crate::domain::{
    DomainResult, RepositoryProvider, StationInfo, StationStatus, TransactionStatus,
};

/// A connector status report as received in StatusNotification.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub connector_id: u32,
    pub status: String,
    pub error_code: Option<String>,
}

pub struct StationService {
    repos: Arc<dyn RepositoryProvider>,
    event_bus: SharedEventBus,
}

impl StationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, event_bus: SharedEventBus) -> Self {
        Self { repos, event_bus }
    }

    /// A connection for `code` was attached. Refreshes the heartbeat.
    pub async fn on_connected(
        &self,
        code: &str,
        remote_addr: Option<String>,
        replaced_previous: bool,
    ) -> DomainResult<()> {
        let now = Utc::now();
        if !self.repos.stations().touch_heartbeat(code, now).await? {
            warn!(station_code = code, "Connected station is not registered");
        }

        track_connected(replaced_previous);
        self.event_bus
            .publish(Event::StationConnected(StationConnectedEvent {
                station_code: code.to_string(),
                remote_addr,
                replaced_previous,
                timestamp: now,
            }));
        Ok(())
    }

    /// The connection for `code` went away and was the registered one.
    pub async fn on_disconnected(&self, code: &str, reason: Option<String>) -> DomainResult<()> {
        track_disconnected();
        self.mark_offline(code).await?;
        self.event_bus
            .publish(Event::StationDisconnected(StationDisconnectedEvent {
                station_code: code.to_string(),
                reason,
                timestamp: Utc::now(),
            }));
        Ok(())
    }

    pub async fn mark_offline(&self, code: &str) -> DomainResult<bool> {
        let updated = self
            .repos
            .stations()
            .update_status(code, StationStatus::Offline)
            .await?;
        if updated {
            info!(station_code = code, "Station marked offline");
            self.publish_status(code, None, None, StationStatus::Offline, None);
        }
        Ok(updated)
    }

    /// BootNotification: refresh heartbeat and identification. Returns the
    /// server time handed back to the station.
    pub async fn boot(&self, code: &str, info: StationInfo) -> DomainResult<DateTime<Utc>> {
        let now = Utc::now();
        if !self.repos.stations().update_info(code, &info, now).await? {
            warn!(station_code = code, "BootNotification from unregistered station");
        }

        info!(
            station_code = code,
            vendor = info.vendor.as_str(),
            model = info.model.as_str(),
            "Station booted"
        );
        self.event_bus
            .publish(Event::BootNotification(BootNotificationEvent {
                station_code: code.to_string(),
                vendor: info.vendor,
                model: info.model,
                firmware_version: info.firmware_version,
                timestamp: now,
            }));
        Ok(now)
    }

    pub async fn heartbeat(&self, code: &str) -> DomainResult<DateTime<Utc>> {
        let now = Utc::now();
        self.repos.stations().touch_heartbeat(code, now).await?;
        self.event_bus
            .publish(Event::HeartbeatReceived(HeartbeatEvent {
                station_code: code.to_string(),
                timestamp: now,
            }));
        Ok(now)
    }

    /// Persist the mapped station status and move the open transaction between
    /// its open sub-states. Finalization is left to StopTransaction.
    pub async fn status_notification(
        &self,
        code: &str,
        report: StatusReport,
    ) -> DomainResult<StationStatus> {
        let status = StationStatus::from_ocpp(&report.status);
        let stations = self.repos.stations();
        if stations.update_status(code, status).await? {
            // A status report is proof of life as much as a heartbeat.
            stations.touch_heartbeat(code, Utc::now()).await?;
        } else {
            warn!(station_code = code, "StatusNotification from unregistered station");
        }

        if let Some(next) = TransactionStatus::from_ocpp(&report.status) {
            if let Some(station) = self.repos.stations().find_by_code(code).await? {
                if let Some(transaction_id) = self
                    .repos
                    .transactions()
                    .transition_open_for_station(station.id, next)
                    .await?
                {
                    info!(
                        station_code = code,
                        transaction_id,
                        status = next.as_str(),
                        "Transaction status changed"
                    );
                }
            }
        }

        self.publish_status(
            code,
            Some(report.connector_id),
            Some(report.status),
            status,
            report.error_code,
        );
        Ok(status)
    }

    fn publish_status(
        &self,
        code: &str,
        connector_id: Option<u32>,
        reported_status: Option<String>,
        status: StationStatus,
        error_code: Option<String>,
    ) {
        self.event_bus
            .publish(Event::StationStatusChanged(StationStatusChangedEvent {
                station_code: code.to_string(),
                connector_id,
                reported_status,
                status: status.as_str().to_string(),
                error_code,
                timestamp: Utc::now(),
            }));
    }
}

/// A replacement takes over the slot of the connection it evicted, which
/// never reports its own disconnect.
fn track_connected(replaced_previous: bool) {
    if !replaced_previous {
        metrics::gauge!("gateway_connected_stations").increment(1.0);
    }
}

fn track_disconnected() {
    metrics::gauge!("gateway_connected_stations").decrement(1.0);
}
