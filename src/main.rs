//! pitempmqtt - Main Entry Point
//!
//! Wires the thermometer, the broker supervisor and the periodic job
//! together and runs until SIGINT or SIGTERM.

use clap::{Parser, Subcommand};
use pitempmqtt::bridge::{ConnectionSupervisor, SupervisorSettings};
use pitempmqtt::config::{BridgeConfig, ConfigOverrides};
use pitempmqtt::error::BridgeResult;
use pitempmqtt::jobs::{schedule, TemperatureJob};
use pitempmqtt::observability::init_default_logging;
use pitempmqtt::sensor;
use pitempmqtt::transport::mqtt::MqttClient;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Upper bound on the whole shutdown sequence
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["pitempmqtt.toml", "config/pitempmqtt.toml"];

/// One-wire temperature to MQTT bridge
#[derive(Parser)]
#[command(name = "pitempmqtt")]
#[command(about = "Publishes one-wire thermometer readings to an MQTT broker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PITEMPMQTT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Override the broker host
    #[arg(long, global = true, env = "PITEMPMQTT_SERVER")]
    server: Option<String>,

    /// Override the broker port
    #[arg(long, global = true, env = "PITEMPMQTT_PORT")]
    port: Option<u16>,

    /// Override the MQTT client id
    #[arg(long, global = true, env = "PITEMPMQTT_CLIENT_ID")]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge
    Run {
        /// Override the sensor read interval, in seconds
        #[arg(long, value_name = "SECS", env = "PITEMPMQTT_INTERVAL")]
        interval: Option<u64>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_default_logging(cli.verbose > 0) {
        eprintln!("Failed to initialize logging: {e}");
    }

    info!("Starting pitempmqtt v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let overrides = ConfigOverrides {
        server: cli.server,
        port: cli.port,
        client_id: cli.client_id,
        read_interval_secs: match cli.command {
            Commands::Run { interval } => interval,
            Commands::Config { .. } => None,
        },
    };
    if let Err(e) = config.apply_overrides(&overrides) {
        error!("Invalid configuration override: {}", e);
        process::exit(1);
    }

    let result = match cli.command {
        Commands::Run { .. } => run_bridge(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: Option<&Path>) -> BridgeResult<BridgeConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(BridgeConfig::load_from_file(path)?);
    }

    for path in DEFAULT_CONFIG_PATHS.iter().map(Path::new) {
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(BridgeConfig::load_from_file(path)?);
        }
    }

    error!("No configuration file found. Please provide one with -c/--config or create pitempmqtt.toml");
    process::exit(1);
}

async fn run_bridge(config: BridgeConfig) -> BridgeResult<()> {
    info!(
        client_id = %config.mqtt.client_id,
        server = %config.mqtt.server,
        port = config.mqtt.port,
        "Application starting"
    );

    let shutdown = CancellationToken::new();

    let (client, events) = MqttClient::new(config.mqtt.clone());
    let supervisor = Arc::new(ConnectionSupervisor::new(
        SupervisorSettings::from_config(&config.mqtt),
        Arc::new(client),
        events,
        &shutdown,
    ));
    supervisor.start().await?;

    let job = TemperatureJob::new(sensor::from_config(&config.sensor), supervisor.clone());
    let scheduled = schedule(job, config.read_interval(), &shutdown)?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    info!("Bridge is running");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }

    info!("Application shutdown initiated");
    let stop = async {
        match scheduled.shutdown().await {
            Ok(runs) => info!(runs, "Temperature job stopped"),
            Err(e) => warn!(error = %e, "Temperature job did not stop cleanly"),
        }
        shutdown.cancel();
        supervisor.stop(true).await;
    };

    if timeout(SHUTDOWN_TIMEOUT, stop).await.is_err() {
        warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timed out, exiting anyway"
        );
    }
    Ok(())
}

fn handle_config_command(config: &BridgeConfig, show: bool) -> BridgeResult<()> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
