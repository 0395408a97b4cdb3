//! Pushover API client
//!
//! One `messages.json` POST per notification. Attachments force the request
//! into multipart form encoding, so every request is sent that way. The
//! emergency re-delivery loop (retry/expire) runs inside the Pushover
//! service; this client only sets the requested parameters.

use super::{DeliveryReceipt, Notification, Notifier, NotifyError, Priority};
use crate::config::{AlertSection, PushoverSection};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ATTACHMENT_FILE_NAME: &str = "capture.jpg";
const ATTACHMENT_MIME: &str = "image/jpeg";

/// Pushover client configuration
#[derive(Debug, Clone)]
pub struct PushoverConfig {
    pub token: String,
    pub recipient: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            recipient: String::new(),
            base_url: "https://api.pushover.net/1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl PushoverConfig {
    /// Build a client configuration from the loaded credentials section
    pub fn from_section(section: &PushoverSection) -> Self {
        Self {
            token: section.token.clone(),
            recipient: section.recipient.clone(),
            ..Default::default()
        }
    }
}

/// Pushover implementation of the [`Notifier`] seam
pub struct PushoverClient {
    config: PushoverConfig,
    alert: AlertSection,
    client: Client,
}

/// Wire response from `messages.json`
#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i32,
    #[serde(default)]
    request: String,
    #[serde(default)]
    errors: Vec<String>,
}

impl PushoverClient {
    /// Create a new Pushover client
    pub fn new(config: PushoverConfig, alert: AlertSection) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        Ok(Self {
            config,
            alert,
            client,
        })
    }

    /// Convert a notification into the multipart form Pushover expects.
    ///
    /// Retry and expire are only valid at emergency priority; the API
    /// rejects them elsewhere.
    fn build_form(config: &PushoverConfig, notification: &Notification) -> Result<Form, NotifyError> {
        let mut form = Form::new()
            .text("token", config.token.clone())
            .text("user", config.recipient.clone())
            .text("title", notification.title.clone())
            .text("message", notification.message.clone())
            .text("priority", notification.priority.value().to_string())
            .text("sound", notification.sound.clone())
            .text("timestamp", notification.timestamp.to_string());

        if !notification.device.is_empty() {
            form = form.text("device", notification.device.clone());
        }

        if notification.priority == Priority::Emergency {
            form = form
                .text("retry", notification.retry.as_secs().to_string())
                .text("expire", notification.expire.as_secs().to_string());
        }

        if let Some(url) = &notification.url {
            form = form.text("url", url.clone());
        }
        if let Some(url_title) = &notification.url_title {
            form = form.text("url_title", url_title.clone());
        }
        if let Some(callback_url) = &notification.callback_url {
            form = form.text("callback", callback_url.clone());
        }

        if let Some(bytes) = &notification.attachment {
            let part = Part::bytes(bytes.clone())
                .file_name(ATTACHMENT_FILE_NAME)
                .mime_str(ATTACHMENT_MIME)
                .map_err(|e| NotifyError::Network(e.to_string()))?;
            form = form.part("attachment", part);
        }

        Ok(form)
    }

    /// Dispatch one notification and return the service's receipt
    pub async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotifyError> {
        let form = Self::build_form(&self.config, notification)?;

        let response = self
            .client
            .post(format!("{}/messages.json", self.config.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<PushoverResponse>(&body) {
                Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join(", "),
                _ => body,
            };
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: PushoverResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::InvalidResponse(e.to_string()))?;

        if parsed.status != 1 {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message: parsed.errors.join(", "),
            });
        }

        debug!(request = %parsed.request, "Pushover accepted notification");
        Ok(DeliveryReceipt {
            request: parsed.request,
        })
    }
}

#[async_trait]
impl Notifier for PushoverClient {
    async fn notify(&self, payload: &[u8]) -> Result<DeliveryReceipt, NotifyError> {
        let notification = Notification::detection(&self.alert, payload);
        self.send(&notification).await
    }
}
