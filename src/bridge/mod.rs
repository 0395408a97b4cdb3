//! Connection lifecycle management
//!
//! Wires the notifier and handler into a broker connection, then holds the
//! foreground on OS signals until shutdown.

pub mod client;
pub mod connection;
pub mod handler;

pub use client::Bridge;
pub use connection::{configure_mqtt_options, qos_from_level, BridgeState};
pub use handler::DetectionHandler;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::notify::{PushoverClient, PushoverConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Run the bridge until an interrupt or termination signal arrives.
///
/// Fatal errors (bad broker URL, initial connection failure) are returned to
/// the caller; everything after the connection is established is handled
/// in-place per the non-fatal policy.
pub async fn run(config: &BridgeConfig) -> BridgeResult<()> {
    let notifier = PushoverClient::new(
        PushoverConfig::from_section(&config.pushover),
        config.alert.clone(),
    )?;
    let handler = Arc::new(DetectionHandler::new(Arc::new(notifier)));

    let mut bridge = Bridge::connect(&config.mqtt, handler).await?;
    info!(server = %config.mqtt.server, "Connected to broker");

    let active = bridge.subscribe(&config.mqtt.topics).await;
    if active == 0 {
        warn!("No active subscriptions; bridge will idle until shutdown");
    }
    info!(topics = ?config.mqtt.topics, "Bridge is running and waiting for detections");

    wait_for_shutdown_signal().await?;

    bridge.shutdown().await;
    Ok(())
}

/// Block until SIGINT or SIGTERM
async fn wait_for_shutdown_signal() -> BridgeResult<()> {
    let mut sigint =
        signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(BridgeError::Signal)?;
    let mut sigterm =
        signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(BridgeError::Signal)?;

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
    }

    Ok(())
}
