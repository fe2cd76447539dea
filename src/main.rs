//! AirMonitor bridge - Main Entry Point
//!
//! Loads configuration from a TOML file and/or the forwarder environment
//! variables, then polls Home Assistant and publishes to AirMonitor until
//! interrupted.

use airmonitor_bridge::{
    logging::{init_logging, LogConfig},
    Bridge, BridgeConfig, Result,
};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

/// AirMonitor bridge configuration
#[derive(Parser, Debug)]
#[command(name = "airmonitor-bridge")]
#[command(about = "Forward Home Assistant air-quality readings to AirMonitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(short, long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON (also BRIDGE_LOG_JSON)
    #[arg(long)]
    json_logs: bool,

    /// Also write logs to this file, rotated daily (also BRIDGE_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Flags win over the BRIDGE_LOG_* environment variables
    fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if self.debug {
            config.level = Level::DEBUG;
        }
        if self.json_logs {
            config.json = true;
        }
        if let Some(path) = &self.log_file {
            config.file_path = Some(path.clone());
        }
        config
    }

    fn load_config(&self) -> Result<BridgeConfig> {
        let config = match &self.config {
            Some(path) => {
                let mut config = BridgeConfig::from_file(path)?;
                config.apply_env_overlay(|key| std::env::var(key).ok())?;
                config
            }
            None => BridgeConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Install the Ctrl-C and SIGTERM handlers now.
///
/// The returned future resolves once either signal arrives, including one
/// raised before it is first polled.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        tokio::select! {
            _ = wait_for(interrupt, "Ctrl-C") => info!("Received Ctrl-C"),
            _ = wait_for(terminate, "SIGTERM") => info!("Received SIGTERM"),
        }
    }
}

#[cfg(unix)]
async fn wait_for(signal: std::io::Result<tokio::signal::unix::Signal>, name: &str) {
    match signal {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            error!("Failed to listen for {name}: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> {
    let ctrl_c = tokio::spawn(tokio::signal::ctrl_c());

    async move {
        match ctrl_c.await {
            Ok(Ok(())) => info!("Received Ctrl-C"),
            _ => {
                error!("Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_config()) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    info!("Starting AirMonitor bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration validation failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string(&config.redacted()) {
        Ok(summary) => info!("Configuration: {summary}"),
        Err(e) => error!("Failed to summarize configuration: {e}"),
    }

    let bridge = match Bridge::from_config(&config) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Failed to initialize bridge: {e}");
            return ExitCode::FAILURE;
        }
    };

    let exit_code = if cli.once {
        let report = bridge.run_cycle().await;
        if report.all_succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    } else {
        bridge.run(shutdown_signal()).await;
        ExitCode::SUCCESS
    };

    let stats = bridge.sink().retry_stats();
    info!(
        operations = stats.total_operations,
        first_attempt = stats.successful_first_attempt,
        after_retry = stats.successful_after_retry,
        failed = stats.failed,
        retries = stats.total_retry_attempts,
        "AirMonitor bridge stopped"
    );

    exit_code
}
