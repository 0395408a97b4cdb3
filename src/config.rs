//! Bridge configuration loaded from a TOML file
//!
//! Every field carries a default so a sparse file still produces a usable
//! configuration. The loader performs no semantic validation; an empty broker
//! address fails later, at connect time, not here.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

static CACHED_CONFIG: OnceCell<BridgeConfig> = OnceCell::new();

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub pushover: PushoverSection,
    #[serde(default)]
    pub alert: AlertSection,
}

/// MQTT broker connection and subscription settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL, `mqtt://host:port` or `mqtts://host:port` for TLS
    #[serde(default)]
    pub server: String,
    /// Topic filters to subscribe to
    #[serde(default)]
    pub topics: Vec<String>,
    /// Quality-of-service level for all subscriptions (0, 1 or 2)
    #[serde(default)]
    pub qos: u8,
    /// Client identifier presented to the broker
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Pushover API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PushoverSection {
    /// Application token
    #[serde(default)]
    pub token: String,
    /// User or group key the notification is delivered to
    #[serde(default)]
    pub recipient: String,
}

/// Notification template applied to every detection event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSection {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_sound")]
    pub sound: String,
    /// Device name tag; empty means all of the recipient's devices
    #[serde(default)]
    pub device: String,
    /// Pushover re-delivery interval for emergency notifications
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
    /// Pushover re-delivery cutoff for emergency notifications
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,
    /// Supplementary URL shown under the notification
    pub url: Option<String>,
    pub url_title: Option<String>,
    /// Acknowledgement callback for emergency notifications
    pub callback_url: Option<String>,
}

fn default_title() -> String {
    "Alarm".to_string()
}

fn default_message() -> String {
    "Person detected".to_string()
}

fn default_sound() -> String {
    "siren".to_string()
}

fn default_retry_secs() -> u64 {
    60
}

fn default_expire_secs() -> u64 {
    3600 // one hour
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            message: default_message(),
            sound: default_sound(),
            device: String::new(),
            retry_secs: default_retry_secs(),
            expire_secs: default_expire_secs(),
            url: None,
            url_title: None,
            callback_url: None,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, caching the first successful result for the
    /// process lifetime. Subsequent calls return the cached value without
    /// touching the file again.
    pub fn load_cached(path: &Path) -> Result<&'static BridgeConfig, ConfigError> {
        CACHED_CONFIG.get_or_try_init(|| Self::load_from_file(path))
    }

}
