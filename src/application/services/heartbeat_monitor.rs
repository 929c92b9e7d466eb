//! Heartbeat Monitor Service
//!
//! Marks stations offline when they fall silent, and closes their
//! connection if one is still registered.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::services::station::StationService;
use crate::application::session::SharedSessionRegistry;
use crate::config::GatewayConfig;
use crate::domain::{DomainResult, RepositoryProvider, StationStatus};
use crate::shared::ShutdownSignal;

/// Configuration for heartbeat monitoring
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to sweep, in seconds
    pub check_interval_secs: u64,
    /// Silence after which a station counts as offline, in seconds
    pub offline_threshold_secs: i64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

impl From<&GatewayConfig> for HeartbeatConfig {
    fn from(gateway: &GatewayConfig) -> Self {
        Self {
            check_interval_secs: gateway.monitor_interval.max(1),
            offline_threshold_secs: gateway.heartbeat_grace().as_secs() as i64,
        }
    }
}

/// What one sweep changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Silent beyond the threshold
    pub timed_out: Vec<String>,
    /// Stored as online without a live connection
    pub orphaned: Vec<String>,
}

pub struct HeartbeatMonitor {
    repos: Arc<dyn RepositoryProvider>,
    stations: Arc<StationService>,
    sessions: SharedSessionRegistry,
    config: HeartbeatConfig,
}

impl HeartbeatMonitor {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        stations: Arc<StationService>,
        sessions: SharedSessionRegistry,
    ) -> Self {
        Self {
            repos,
            stations,
            sessions,
            config: HeartbeatConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HeartbeatConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the background sweep
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                check_interval_secs = self.config.check_interval_secs,
                offline_threshold_secs = self.config.offline_threshold_secs,
                "Heartbeat monitor started"
            );

            let mut interval =
                tokio::time::interval(Duration::from_secs(self.config.check_interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.sweep_at(Utc::now()).await {
                            warn!(error = %e, "Heartbeat check failed");
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Heartbeat monitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Check every station that is not already offline. A live connection is
    /// judged by its last inbound frame; any frame counts, not only
    /// Heartbeat. Without one, the stored heartbeat decides.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> DomainResult<SweepReport> {
        let stations = self.repos.stations().find_all().await?;
        let threshold = self.config.offline_threshold_secs;
        let stale: HashSet<String> = self
            .sessions
            .stale_connections(threshold, now)
            .into_iter()
            .collect();
        let mut report = SweepReport::default();

        debug!(stations = stations.len(), stale = stale.len(), "Checking heartbeats");

        for station in stations {
            if station.status == StationStatus::Offline {
                continue;
            }

            let connected = self.sessions.is_connected(&station.code);
            let timed_out = if connected {
                stale.contains(&station.code)
            } else {
                station.silent_for(now).map_or(true, |secs| secs > threshold)
            };

            if timed_out {
                info!(
                    station_code = station.code.as_str(),
                    last_heartbeat = ?station.last_heartbeat,
                    connected,
                    "Heartbeat grace exceeded"
                );
                self.stations.mark_offline(&station.code).await?;
                self.sessions.close(&station.code);
                report.timed_out.push(station.code);
            } else if !connected {
                info!(
                    station_code = station.code.as_str(),
                    "Station has no live connection"
                );
                self.stations.mark_offline(&station.code).await?;
                report.orphaned.push(station.code);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::EventBus;
    use crate::application::session::{Outbound, SessionRegistry};
    use crate::infrastructure::SeaOrmRepositoryProvider;
    use crate::test_support::{memory_db, seed_station, set_station_heartbeat, station_status};
    use chrono::Duration as ChronoDuration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn marks_silent_and_orphaned_stations_offline() {
        let db = memory_db().await;
        for code in ["SILENT", "ORPHAN", "HEALTHY", "IDLE"] {
            seed_station(&db, code).await;
        }

        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let stations = Arc::new(StationService::new(repos.clone(), Arc::new(EventBus::new())));
        let sessions = SessionRegistry::shared();

        let now = Utc::now();
        for code in ["SILENT", "ORPHAN", "HEALTHY"] {
            repos
                .stations()
                .update_status(code, StationStatus::Available)
                .await
                .unwrap();
        }
        set_station_heartbeat(&db, "SILENT", now - ChronoDuration::seconds(700)).await;
        set_station_heartbeat(&db, "ORPHAN", now - ChronoDuration::seconds(10)).await;
        set_station_heartbeat(&db, "HEALTHY", now - ChronoDuration::seconds(10)).await;

        let (silent_tx, mut silent_rx) = mpsc::unbounded_channel();
        let (healthy_tx, _healthy_rx) = mpsc::unbounded_channel();
        let silent = sessions.attach("SILENT", silent_tx, None);
        sessions.attach("HEALTHY", healthy_tx, None);
        sessions.touch("SILENT", silent.connection_id, now - ChronoDuration::seconds(700));

        let monitor = HeartbeatMonitor::new(repos, stations, sessions).with_config(HeartbeatConfig {
            check_interval_secs: 60,
            offline_threshold_secs: 600,
        });

        let report = monitor.sweep_at(now).await.unwrap();
        assert_eq!(report.timed_out, vec!["SILENT".to_string()]);
        assert_eq!(report.orphaned, vec!["ORPHAN".to_string()]);

        assert_eq!(station_status(&db, "SILENT").await, "offline");
        assert_eq!(station_status(&db, "ORPHAN").await, "offline");
        assert_eq!(station_status(&db, "HEALTHY").await, "available");
        assert_eq!(silent_rx.try_recv().unwrap(), Outbound::Close);
    }

    #[tokio::test]
    async fn busy_connection_outlives_an_old_heartbeat() {
        let db = memory_db().await;
        seed_station(&db, "ST-001").await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let stations = Arc::new(StationService::new(repos.clone(), Arc::new(EventBus::new())));
        let sessions = SessionRegistry::shared();

        let now = Utc::now();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let attached = sessions.attach("ST-001", tx, None);
        repos
            .stations()
            .update_status("ST-001", StationStatus::Occupied)
            .await
            .unwrap();
        set_station_heartbeat(&db, "ST-001", now - ChronoDuration::seconds(700)).await;
        // MeterValues and StatusNotification keep arriving.
        sessions.touch("ST-001", attached.connection_id, now);

        let monitor = HeartbeatMonitor::new(repos, stations, sessions.clone()).with_config(
            HeartbeatConfig {
                check_interval_secs: 60,
                offline_threshold_secs: 600,
            },
        );

        let report = monitor.sweep_at(now).await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert_eq!(station_status(&db, "ST-001").await, "occupied");
        assert!(rx.try_recv().is_err());
        assert!(sessions.is_connected("ST-001"));
    }

    #[test]
    fn threshold_follows_gateway_timing() {
        let config = HeartbeatConfig::from(&GatewayConfig {
            heartbeat_interval: 300,
            heartbeat_grace_multiplier: 2,
            monitor_interval: 30,
            command_timeout: 30,
        });
        assert_eq!(config.offline_threshold_secs, 600);
        assert_eq!(config.check_interval_secs, 30);
    }
}
