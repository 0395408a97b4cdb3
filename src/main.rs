//! pushbridge - Main Entry Point
//!
//! Loads configuration, starts the bridge, and exits non-zero when startup
//! fails. Once running, the process lives until SIGINT/SIGTERM.

use clap::{Parser, Subcommand};
use pushbridge::config::BridgeConfig;
use pushbridge::observability::init_default_logging;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// MQTT to Pushover detection bridge
#[derive(Parser)]
#[command(name = "pushbridge")]
#[command(about = "Forwards MQTT detection events as Pushover emergency notifications")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge until interrupted
    Run,
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

    init_default_logging();

    info!("Starting pushbridge v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_bridge(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<&'static BridgeConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(BridgeConfig::load_cached(path)?)
        }
        None => {
            // Try default locations
            let default_paths = vec!["bridge.toml", "config/bridge.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(BridgeConfig::load_cached(&path)?);
                }
            }

            error!("No configuration file found. Please provide one with -c/--config or create bridge.toml");
            process::exit(1);
        }
    }
}

async fn run_bridge(config: &BridgeConfig) -> Result<(), Box<dyn std::error::Error>> {
    pushbridge::bridge::run(config).await?;
    Ok(())
}

fn handle_config_command(
    config: &BridgeConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
