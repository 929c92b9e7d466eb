//! Gateway runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: database, migrations, the
//! OCPP WebSocket listener, background sweeps, metrics and graceful
//! shutdown. The CLI binary is a thin wrapper around it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::commands::{CommandSender, SharedCommandSender};
use crate::application::events::{create_event_bus, SharedEventBus};
use crate::application::handlers::GatewayServices;
use crate::application::services::{
    ChargingService, HeartbeatConfig, HeartbeatMonitor, SettlementEngine, StationService,
};
use crate::application::session::{SessionRegistry, SharedSessionRegistry};
use crate::config::{AppConfig, LoggingConfig, MetricsConfig};
use crate::domain::{AuditLogger, RepositoryProvider};
use crate::infrastructure::{
    init_database, run_migrations, DatabaseAuditLogger, DatabaseConfig, SeaOrmRepositoryProvider,
};
use crate::interfaces::ws::OcppServer;
use crate::shared::{AppError, ShutdownCoordinator, ShutdownSignal};

/// Options for starting the gateway.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

/// Handle to a running gateway.
pub struct ServerHandle {
    pub event_bus: SharedEventBus,
    pub repos: Arc<dyn RepositoryProvider>,
    pub sessions: SharedSessionRegistry,
    /// Issues Reset, RemoteStart, RemoteStop and UnlockConnector.
    pub commands: SharedCommandSender,
    pub config: AppConfig,
    /// Address the WebSocket listener is bound to.
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    ws_task: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Start the gateway.
    ///
    /// 1. Install the Prometheus exporter if enabled
    /// 2. Connect to the database and run migrations
    /// 3. Wire services and start the WebSocket listener
    /// 4. Start the heartbeat monitor and the command reaper
    pub async fn start(opts: ServerOptions) -> Result<Self, AppError> {
        let config = opts.config;
        config.validate()?;

        info!("Starting EV charging gateway");

        install_metrics(&config.metrics)?;

        let db = init_database(&DatabaseConfig::from(config.database.clone())).await?;
        if opts.auto_migrate {
            run_migrations(&db).await?;
        }

        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let event_bus = create_event_bus();
        let sessions = SessionRegistry::shared();
        let audit: Arc<dyn AuditLogger> = Arc::new(DatabaseAuditLogger::new(db.clone()));

        let commands = Arc::new(CommandSender::new(
            sessions.clone(),
            audit.clone(),
            event_bus.clone(),
            config.gateway.command_timeout(),
        ));
        let settlement = Arc::new(SettlementEngine::new(
            repos.clone(),
            &config.pricing,
            &config.settlement,
        ));
        let charging = Arc::new(ChargingService::new(
            repos.clone(),
            settlement,
            event_bus.clone(),
        ));
        let stations = Arc::new(StationService::new(repos.clone(), event_bus.clone()));

        let services = Arc::new(GatewayServices {
            charging,
            stations: stations.clone(),
            commands: commands.clone(),
            audit,
            event_bus: event_bus.clone(),
            heartbeat_interval: config.gateway.heartbeat_interval,
        });

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let signal = shutdown.signal();

        let monitor = Arc::new(
            HeartbeatMonitor::new(repos.clone(), stations, sessions.clone())
                .with_config(HeartbeatConfig::from(&config.gateway)),
        );
        let background = vec![
            commands.spawn_reaper(signal.clone()),
            monitor.start(signal.clone()),
        ];

        let listener = OcppServer::bind(&config.server.address()).await?;
        let local_addr = listener.local_addr()?;
        let server = OcppServer::new(sessions.clone(), services, signal);
        let ws_task = tokio::spawn(server.serve(listener));

        info!(address = %local_addr, "Gateway started");

        Ok(Self {
            event_bus,
            repos,
            sessions,
            commands,
            config,
            local_addr,
            db,
            shutdown,
            ws_task,
            background,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGINT or SIGTERM.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then for every task to stop.
    /// The database connection is closed last.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            ws_task,
            background,
            ..
        } = self;

        let finished = shutdown
            .drain(async move {
                if let Err(e) = ws_task.await {
                    error!(error = %e, "WebSocket server task panicked");
                }
                for task in background {
                    if let Err(e) = task.await {
                        error!(error = %e, "Background task panicked");
                    }
                }
            })
            .await;

        if !finished {
            warn!("Some tasks were still running at shutdown");
        }

        match db.close().await {
            Ok(()) => info!("Database connection closed"),
            Err(e) => warn!(error = %e, "Error closing database connection"),
        }

        info!("Gateway shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down gateway");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.ws_task.is_finished()
    }
}

/// The global recorder can only be installed once per process.
static METRICS_INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

fn install_metrics(config: &MetricsConfig) -> Result<(), AppError> {
    if !config.enabled {
        return Ok(());
    }
    if let Some(addr) = METRICS_INSTALLED.get() {
        info!(address = %addr, "Prometheus exporter already installed");
        return Ok(());
    }

    let addr: SocketAddr = config
        .listen
        .parse()
        .map_err(|e| AppError::Metrics(format!("invalid listen address {}: {}", config.listen, e)))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Metrics(e.to_string()))?;

    let _ = METRICS_INSTALLED.set(addr);
    info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Initialize tracing from the logging config. `RUST_LOG` wins over the
/// configured level.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    match config.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
