//! Push-notification layer
//!
//! Defines the outbound [`Notification`] value, the [`Notifier`] seam the
//! message handler talks to, and the Pushover implementation behind it.

pub mod pushover;

pub use pushover::{PushoverClient, PushoverConfig};

use crate::config::AlertSection;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Pushover priority tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Lowest,
    Low,
    Normal,
    High,
    /// Re-delivered by the service until acknowledged or expired
    Emergency,
}

impl Priority {
    /// Numeric level used on the wire
    pub fn value(self) -> i8 {
        match self {
            Priority::Lowest => -2,
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Emergency => 2,
        }
    }
}

/// One outbound notification, built per inbound message and discarded after
/// the send call returns.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub sound: String,
    /// Target device tag; empty means all of the recipient's devices
    pub device: String,
    /// Unix timestamp shown as the notification's time
    pub timestamp: i64,
    /// Service-side re-delivery interval, transmitted only at emergency priority
    pub retry: Duration,
    /// Service-side re-delivery cutoff, transmitted only at emergency priority
    pub expire: Duration,
    pub url: Option<String>,
    pub url_title: Option<String>,
    pub callback_url: Option<String>,
    pub attachment: Option<Vec<u8>>,
}

impl Notification {
    /// Build the emergency notification for a detection event.
    ///
    /// A non-empty payload rides along as a binary attachment; an empty
    /// payload produces a plain notification.
    pub fn detection(alert: &AlertSection, payload: &[u8]) -> Self {
        Self {
            title: alert.title.clone(),
            message: alert.message.clone(),
            priority: Priority::Emergency,
            sound: alert.sound.clone(),
            device: alert.device.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            retry: Duration::from_secs(alert.retry_secs),
            expire: Duration::from_secs(alert.expire_secs),
            url: alert.url.clone(),
            url_title: alert.url_title.clone(),
            callback_url: alert.callback_url.clone(),
            attachment: if payload.is_empty() {
                None
            } else {
                Some(payload.to_vec())
            },
        }
    }
}

/// Delivery receipt returned by the push service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Request identifier assigned by the service
    pub request: String,
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Network(String),

    #[error("Push service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid push service response: {0}")]
    InvalidResponse(String),
}

/// Seam between the message handler and the push service.
///
/// The bridge only ever hands over the raw payload; everything else about the
/// notification comes from configuration held by the implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &[u8]) -> Result<DeliveryReceipt, NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_wire_values() {
        assert_eq!(Priority::Lowest.value(), -2);
        assert_eq!(Priority::Low.value(), -1);
        assert_eq!(Priority::Normal.value(), 0);
        assert_eq!(Priority::High.value(), 1);
        assert_eq!(Priority::Emergency.value(), 2);
    }

    #[test]
    fn test_detection_attaches_non_empty_payload() {
        let alert = AlertSection::default();
        let notification = Notification::detection(&alert, &[0xff, 0xd8, 0xff]);

        assert_eq!(notification.attachment, Some(vec![0xff, 0xd8, 0xff]));
    }

    #[test]
    fn test_detection_skips_empty_payload() {
        let alert = AlertSection::default();
        let notification = Notification::detection(&alert, &[]);

        assert!(notification.attachment.is_none());
    }

    #[test]
    fn test_detection_uses_alert_template() {
        let alert = AlertSection {
            title: "Intruder".to_string(),
            message: "Motion at the gate".to_string(),
            sound: "alien".to_string(),
            device: "phone".to_string(),
            retry_secs: 30,
            expire_secs: 600,
            url: Some("https://cam.example.com/live".to_string()),
            url_title: Some("Live view".to_string()),
            callback_url: None,
        };
        let notification = Notification::detection(&alert, b"frame");

        assert_eq!(notification.title, "Intruder");
        assert_eq!(notification.message, "Motion at the gate");
        assert_eq!(notification.priority, Priority::Emergency);
        assert_eq!(notification.sound, "alien");
        assert_eq!(notification.device, "phone");
        assert_eq!(notification.retry, Duration::from_secs(30));
        assert_eq!(notification.expire, Duration::from_secs(600));
        assert_eq!(notification.url.as_deref(), Some("https://cam.example.com/live"));
        assert!(notification.timestamp > 0);
    }

    #[test]
    fn test_detection_defaults_match_alarm_template() {
        let alert = AlertSection::default();
        let notification = Notification::detection(&alert, b"frame");

        assert_eq!(notification.title, "Alarm");
        assert_eq!(notification.message, "Person detected");
        assert_eq!(notification.sound, "siren");
        assert_eq!(notification.retry, Duration::from_secs(60));
        assert_eq!(notification.expire, Duration::from_secs(3600));
    }
}
