//! Per-message subscription handler
//!
//! Invoked once per inbound publish. Failures from the notifier are logged
//! and swallowed here; nothing may propagate back into the connection's
//! delivery loop.

use crate::notify::Notifier;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns inbound detection messages into push notifications
pub struct DetectionHandler {
    notifier: Arc<dyn Notifier>,
}

impl DetectionHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Handle one inbound message. Never returns an error.
    pub async fn handle(&self, topic: &str, payload: Bytes) {
        info!(topic, bytes = payload.len(), "Received message");
        debug!(topic, payload = ?payload, "Message payload");

        match self.notifier.notify(&payload).await {
            Ok(receipt) => {
                info!(topic, request = %receipt.request, "Notification dispatched");
            }
            Err(e) => {
                // Non-fatal: this message is dropped, the next one is unaffected
                warn!(topic, error = %e, "Notification failed");
            }
        }
    }
}
