//! Pure connection pieces for the bridge
//!
//! Connection state, QoS mapping, and MQTT option building live here so the
//! impure client code stays thin and the interesting decisions are testable
//! without a broker.

use crate::config::MqttSection;
use crate::error::BridgeError;
use rumqttc::v5::MqttOptions;
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;
use url::Url;

/// Lifecycle state of the broker connection
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeState {
    /// Waiting for the broker to acknowledge the connect
    Connecting,
    /// ConnAck received, ready for subscriptions
    Connected,
    /// Issuing subscribe requests
    Subscribing,
    /// Delivering messages, foreground blocked on signals
    Running,
    /// Teardown in progress
    Disconnecting,
    /// Not connected, with reason
    Disconnected(String),
}

/// Map the configured 0/1/2 level onto MQTT quality-of-service.
///
/// Out-of-range values fall back to at-most-once; the loader does not
/// validate them.
pub fn qos_from_level(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

/// Client id presented to the broker.
///
/// An empty configured id makes some brokers reject or recycle the session;
/// fall back to a generated one.
pub fn effective_client_id(configured: &str) -> String {
    if configured.is_empty() {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("pushbridge-{timestamp}")
    } else {
        configured.to_string()
    }
}

/// Build rumqttc options from the loaded MQTT section.
///
/// TLS is selected by the URL scheme: `mqtts://` enables rustls with default
/// configuration and defaults the port to 8883, anything else is plaintext
/// on 1883.
pub fn configure_mqtt_options(config: &MqttSection) -> Result<MqttOptions, BridgeError> {
    let url =
        Url::parse(&config.server).map_err(|_| BridgeError::InvalidBrokerUrl(config.server.clone()))?;

    let host = url
        .host_str()
        .ok_or_else(|| BridgeError::InvalidBrokerUrl(config.server.clone()))?;
    let port = url
        .port()
        .unwrap_or(if url.scheme() == "mqtts" { 8883 } else { 1883 });

    let mut mqtt_options = MqttOptions::new(effective_client_id(&config.client_id), host, port);

    if url.scheme() == "mqtts" {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if !config.username.is_empty() {
        mqtt_options.set_credentials(&config.username, &config.password);
    }

    mqtt_options.set_keep_alive(Duration::from_secs(60));

    Ok(mqtt_options)
}
