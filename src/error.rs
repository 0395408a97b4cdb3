//! Error types for the bridge
//!
//! One aggregate enum covers the whole failure taxonomy. Fatal kinds abort
//! startup with a non-zero exit; non-fatal kinds are logged at their point of
//! origin and swallowed so the delivery loop is never interrupted.

use crate::config::ConfigError;
use crate::notify::NotifyError;
use thiserror::Error;

/// Main error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subscription to '{topic}' failed: {reason}")]
    Subscription { topic: String, reason: String },

    #[error("Notification error: {0}")]
    Notification(#[from] NotifyError),

    #[error("Signal handler setup failed: {0}")]
    Signal(std::io::Error),
}

impl BridgeError {
    /// Whether this error should abort the process.
    ///
    /// Configuration and initial-connection failures are fatal; a failed
    /// subscription or notification only affects the operation it belongs to.
    pub fn is_fatal(&self) -> bool {
        match self {
            BridgeError::Config(_)
            | BridgeError::InvalidBrokerUrl(_)
            | BridgeError::Connection(_)
            | BridgeError::Signal(_) => true,
            BridgeError::Subscription { .. } | BridgeError::Notification(_) => false,
        }
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
