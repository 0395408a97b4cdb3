//! pushbridge - MQTT to Pushover detection bridge
//!
//! Subscribes to detection-event topics on an MQTT broker and forwards one
//! emergency push notification per inbound message to the Pushover API,
//! attaching the payload (typically a camera frame) when it is non-empty.
//!
//! # Overview
//!
//! - Typed TOML configuration with a process-lifetime cache
//! - rumqttc connection lifecycle with TLS via `mqtts://` URLs
//! - Per-message fire-and-forget notification dispatch
//! - Graceful SIGINT/SIGTERM shutdown with best-effort unsubscribes
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pushbridge::config::BridgeConfig;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::load_from_file(Path::new("bridge.toml"))?;
//!     pushbridge::bridge::run(&config).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod notify;
pub mod observability;

pub use bridge::{Bridge, BridgeState, DetectionHandler};
pub use config::{BridgeConfig, ConfigError};
pub use error::{BridgeError, BridgeResult};
pub use notify::{DeliveryReceipt, Notification, Notifier, NotifyError, Priority, PushoverClient};
