//! Pushover delivery tests against a mocked API
//!
//! Tests behavioral contracts of the notification sender and the handler's
//! resilience: request content on the wire, error taxonomy, and independence
//! of consecutive sends.

use bytes::Bytes;
use pushbridge::bridge::DetectionHandler;
use pushbridge::config::AlertSection;
use pushbridge::notify::{Notifier, NotifyError, PushoverClient, PushoverConfig};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> PushoverClient {
    let config = PushoverConfig {
        token: "app-token".to_string(),
        recipient: "user-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
    };
    PushoverClient::new(config, AlertSection::default()).unwrap()
}

fn accepted_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": 1,
        "request": "647d2300-702c-4b38-8b2f-d56326ae460b"
    }))
}

async fn request_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

#[tokio::test]
async fn test_successful_send_returns_receipt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(accepted_response())
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let receipt = client.notify(b"frame").await.unwrap();

    assert_eq!(receipt.request, "647d2300-702c-4b38-8b2f-d56326ae460b");
}

#[tokio::test]
async fn test_non_empty_payload_is_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(accepted_response())
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    client.notify(b"jpeg-bytes").await.unwrap();

    let bodies = request_bodies(&mock_server).await;
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("name=\"attachment\""));
    assert!(bodies[0].contains("filename=\"capture.jpg\""));
    assert!(bodies[0].contains("jpeg-bytes"));
}

#[tokio::test]
async fn test_empty_payload_sends_no_attachment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(accepted_response())
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    client.notify(b"").await.unwrap();

    let bodies = request_bodies(&mock_server).await;
    assert_eq!(bodies.len(), 1);
    assert!(!bodies[0].contains("name=\"attachment\""));
}

#[tokio::test]
async fn test_emergency_parameters_on_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(accepted_response())
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    client.notify(b"frame").await.unwrap();

    let bodies = request_bodies(&mock_server).await;
    let body = &bodies[0];

    assert!(body.contains("name=\"token\""));
    assert!(body.contains("name=\"user\""));
    assert!(body.contains("name=\"priority\"\r\n\r\n2"));
    assert!(body.contains("name=\"retry\"\r\n\r\n60"));
    assert!(body.contains("name=\"expire\"\r\n\r\n3600"));
    assert!(body.contains("name=\"sound\"\r\n\r\nsiren"));
    assert!(body.contains("name=\"title\"\r\n\r\nAlarm"));
    assert!(body.contains("name=\"message\"\r\n\r\nPerson detected"));
}

#[tokio::test]
async fn test_http_failure_surfaces_as_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client.notify(b"frame").await.unwrap_err();

    assert!(matches!(err, NotifyError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_rejected_request_carries_service_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": 0,
            "errors": ["application token is invalid"]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client.notify(b"frame").await.unwrap_err();

    match err {
        NotifyError::Api { message, .. } => {
            assert!(message.contains("application token is invalid"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_send_does_not_prevent_the_next_one() {
    let mock_server = MockServer::start().await;

    // First request fails, every later one is accepted
    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(accepted_response())
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());

    let first = client.notify(b"first").await;
    assert!(first.is_err());

    let second = client.notify(b"second").await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_handler_keeps_processing_after_delivery_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages.json"))
        .respond_with(accepted_response())
        .mount(&mock_server)
        .await;

    let handler = DetectionHandler::new(Arc::new(test_client(&mock_server.uri())));

    // The failing invocation must not raise; the next message triggers its
    // own independent send attempt.
    handler
        .handle("alerts/front", Bytes::from_static(b"first"))
        .await;
    handler
        .handle("alerts/back", Bytes::from_static(b"second"))
        .await;

    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}
