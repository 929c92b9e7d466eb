//! EV charging gateway, CLI server
//!
//! Headless OCPP 1.6 gateway suitable for a systemd unit or a container.
//!
//! ```sh
//! # Default config (~/.config/ev-gateway/config.toml)
//! ev-gateway
//!
//! # Custom config path and port
//! ev-gateway --config /etc/ev-gateway/config.toml --port 9000
//!
//! # Validate config without starting
//! ev-gateway --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use evcs_gateway::config::AppConfig;
use evcs_gateway::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "ev-gateway",
    version,
    about = "OCPP 1.6 gateway for EV charging stations",
    long_about = "WebSocket gateway for EV charging stations speaking OCPP-J 1.6, \
                  with wallet settlement and split PEA/solar pricing.\n\n\
                  Default config: ~/.config/ev-gateway/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCPP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the WebSocket listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(evcs_gateway::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if cli.check {
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   WS address  : {}", config.server.address());
        println!("   Database    : {}", config.database.url);
        println!("   Heartbeat   : {}s", config.gateway.heartbeat_interval);
        println!("   Log level   : {}", config.logging.level);
        return ExitCode::SUCCESS;
    }

    init_tracing(&config.logging);
    info!(path = %config_path.display(), "Configuration loaded");

    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "Failed to start gateway");
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    handle.wait().await;
    ExitCode::SUCCESS
}
