//! Impure I/O side of the bridge: the rumqttc client and its event loop
//!
//! The event loop runs on its own tokio task and routes inbound publishes to
//! the handler; each message is handled on a freshly spawned task so slow
//! notification sends never stall message delivery.

use super::connection::{configure_mqtt_options, qos_from_level, BridgeState};
use super::handler::DetectionHandler;
use crate::config::MqttSection;
use crate::error::BridgeError;
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, Event, EventLoop};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Grace period for in-flight work between disconnect and process exit
const DISCONNECT_GRACE: Duration = Duration::from_millis(250);
const EVENT_LOOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
/// Pause after a poll error so a dead broker does not become a hot loop
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Broker connection with its background event loop
pub struct Bridge {
    client: AsyncClient,
    qos: QoS,
    subscribed: Arc<Mutex<Vec<String>>>,
    state_tx: watch::Sender<BridgeState>,
    state_rx: watch::Receiver<BridgeState>,
    shutdown_tx: watch::Sender<bool>,
    event_loop_handle: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Connect to the broker and start the event loop.
    ///
    /// Returns only after the broker acknowledged the connection; an initial
    /// connection failure is fatal to the caller.
    pub async fn connect(
        config: &MqttSection,
        handler: Arc<DetectionHandler>,
    ) -> Result<Self, BridgeError> {
        let mqtt_options = configure_mqtt_options(config)?;
        let qos = qos_from_level(config.qos);

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let ((state_tx, state_rx), (shutdown_tx, shutdown_rx)) = Self::setup_channels();
        let subscribed = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn(run_event_loop(
            event_loop,
            client.clone(),
            handler,
            state_tx.clone(),
            shutdown_rx,
            subscribed.clone(),
            qos,
        ));

        if let Err(e) = Self::wait_for_connack(state_rx.clone(), CONNECT_TIMEOUT).await {
            let _ = shutdown_tx.send(true);
            handle.abort();
            return Err(e);
        }

        Ok(Self {
            client,
            qos,
            subscribed,
            state_tx,
            state_rx,
            shutdown_tx,
            event_loop_handle: Some(handle),
        })
    }

    /// Create connection state and shutdown channels
    #[allow(clippy::type_complexity)]
    fn setup_channels() -> (
        (watch::Sender<BridgeState>, watch::Receiver<BridgeState>),
        (watch::Sender<bool>, watch::Receiver<bool>),
    ) {
        (
            watch::channel(BridgeState::Connecting),
            watch::channel(false),
        )
    }

    /// Wait for the broker's ConnAck, surfaced through the state channel
    async fn wait_for_connack(
        mut state_rx: watch::Receiver<BridgeState>,
        timeout: Duration,
    ) -> Result<(), BridgeError> {
        let wait = tokio::time::timeout(timeout, async {
            loop {
                match &*state_rx.borrow() {
                    BridgeState::Connected => return Ok(()),
                    BridgeState::Disconnected(reason) => {
                        return Err(BridgeError::Connection(reason.clone()));
                    }
                    _ => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(BridgeError::Connection("State channel closed".to_string()));
                }
            }
        })
        .await;

        match wait {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Connection(
                "ConnAck timeout - no connection confirmation received".to_string(),
            )),
        }
    }

    /// Subscribe to each topic at the configured QoS level.
    ///
    /// A failure for one topic is logged and does not abort the remaining
    /// topics. Returns the number of active subscriptions.
    pub async fn subscribe(&mut self, topics: &[String]) -> usize {
        let _ = self.state_tx.send(BridgeState::Subscribing);

        let mut active = 0;
        for topic in topics {
            match self.client.subscribe(topic.as_str(), self.qos).await {
                Ok(()) => {
                    self.subscribed.lock().await.push(topic.clone());
                    active += 1;
                    info!(%topic, qos = ?self.qos, "Subscribed");
                }
                Err(e) => {
                    let err = BridgeError::Subscription {
                        topic: topic.clone(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Continuing with remaining topics");
                }
            }
        }

        let _ = self.state_tx.send(BridgeState::Running);
        active
    }

    /// Current lifecycle state
    pub fn state(&self) -> BridgeState {
        self.state_rx.borrow().clone()
    }

    /// Topics with an active subscription
    pub async fn subscribed_topics(&self) -> Vec<String> {
        self.subscribed.lock().await.clone()
    }

    /// Unsubscribe from every topic, disconnect, and stop the event loop.
    ///
    /// Unsubscribes are best-effort; individual failures are logged and the
    /// teardown continues.
    pub async fn shutdown(&mut self) {
        let _ = self.state_tx.send(BridgeState::Disconnecting);

        let topics: Vec<String> = self.subscribed.lock().await.drain(..).collect();
        for topic in &topics {
            if let Err(e) = self.client.unsubscribe(topic.as_str()).await {
                warn!(%topic, error = %e, "Unsubscribe failed");
            } else {
                debug!(%topic, "Unsubscribed");
            }
        }

        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "Disconnect request failed");
        }

        // The event loop is still polling, so the unsubscribe and disconnect
        // packets get flushed during the grace period.
        tokio::time::sleep(DISCONNECT_GRACE).await;

        let _ = self.shutdown_tx.send(true);
        if let Some(mut handle) = self.event_loop_handle.take() {
            match tokio::time::timeout(EVENT_LOOP_JOIN_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => info!("Event loop task shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!(error = %e, "Event loop task ended with error");
                }
                Err(_) => {
                    warn!("Event loop task did not stop in time, aborting");
                    handle.abort();
                }
                _ => {}
            }
        }

        let _ = self
            .state_tx
            .send(BridgeState::Disconnected("Client disconnected".to_string()));
        info!("Disconnected from broker");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Stop the background task; graceful teardown needs an explicit
        // shutdown() call, which cannot happen in Drop.
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}

/// Poll the rumqttc event loop until shutdown, routing publishes to the
/// handler and re-subscribing tracked topics whenever the broker accepts a
/// fresh session.
async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    handler: Arc<DetectionHandler>,
    state_tx: watch::Sender<BridgeState>,
    mut shutdown_rx: watch::Receiver<bool>,
    subscribed: Arc<Mutex<Vec<String>>>,
    qos: QoS,
) {
    let mut connected_once = false;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Shutdown signal received, stopping event loop");
                    break;
                }
            }

            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    let _ = state_tx.send(BridgeState::Connected);
                    if connected_once {
                        info!("Reconnected to broker");
                        resubscribe(&client, &subscribed, qos).await;
                    }
                    connected_once = true;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = String::from_utf8_lossy(&publish.topic).into_owned();
                    let payload = publish.payload.clone();
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler.handle(&topic, payload).await;
                    });
                }
                Ok(event) => {
                    debug!(?event, "MQTT event");
                }
                Err(e) => {
                    let _ = state_tx.send(BridgeState::Disconnected(e.to_string()));
                    error!(error = %e, "MQTT event loop error");
                    if !interruptible_sleep(shutdown_rx.clone(), RECONNECT_PAUSE).await {
                        break;
                    }
                }
            }
        }
    }

    info!("MQTT event loop stopped");
}

/// Restore subscriptions after the broker accepted a fresh session; a clean
/// start drops them server-side.
async fn resubscribe(client: &AsyncClient, subscribed: &Arc<Mutex<Vec<String>>>, qos: QoS) {
    for topic in subscribed.lock().await.iter() {
        if let Err(e) = client.subscribe(topic.as_str(), qos).await {
            warn!(%topic, error = %e, "Re-subscribe failed");
        } else {
            debug!(%topic, "Re-subscribed");
        }
    }
}

/// Sleep that wakes early on the shutdown signal.
/// Returns false if shutdown was requested.
async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown_rx.changed() => !*shutdown_rx.borrow(),
        _ = tokio::time::sleep(delay) => true,
    }
}
