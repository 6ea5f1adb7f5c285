//! Integration tests for the webhook server.
//!
//! These tests start a real HTTP server, send actual HTTP requests,
//! and verify end-to-end functionality.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use webhook_server::{WebhookPayload, WebhookServer};

async fn start_server() -> (WebhookServer, mpsc::UnboundedReceiver<WebhookPayload>) {
    let (tx, rx) = mpsc::unbounded_channel::<WebhookPayload>();
    let server = WebhookServer::bind(([127, 0, 0, 1], 0).into(), tx)
        .await
        .expect("Failed to start webhook server");
    (server, rx)
}

/// Test that the server acknowledges events and forwards them over the channel.
#[tokio::test]
async fn test_webhook_server_end_to_end() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();

    let event = r#"{
        "topic": "mdm.Authenticate",
        "event_id": "5b1bd5ae-d3d7-4d35-8e4b-b9f2b1a6f3a4",
        "created_at": "2018-04-03T14:29:54.512Z",
        "checkin_event": {
            "udid": "564D1B0F-39C8-4B4C-9B1D-7D9C3C7E7C5A",
            "url_params": null,
            "raw_payload": "PD94bWwgdmVyc2lvbj0iMS4wIj8+"
        }
    }"#;

    let response = client
        .post(server.webhook_url())
        .header("Content-Type", "application/json")
        .body(event)
        .send()
        .await
        .expect("Failed to send HTTP request");

    assert_eq!(response.status(), 200);

    let payload = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("Timeout waiting for payload")
        .expect("No payload received");

    assert_eq!(payload.event["topic"], "mdm.Authenticate");
    assert_eq!(
        payload.event["checkin_event"]["udid"],
        "564D1B0F-39C8-4B4C-9B1D-7D9C3C7E7C5A"
    );
    assert!(payload.remote_addr.is_some());

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Malformed bodies are still acknowledged, but never forwarded.
#[tokio::test]
async fn test_invalid_body_is_acknowledged_but_not_forwarded() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.webhook_url())
        .body("{ truncated")
        .send()
        .await
        .expect("Failed to send HTTP request");

    assert_eq!(response.status(), 200);

    let nothing = timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(nothing.is_err(), "Invalid JSON should not be forwarded");

    server.shutdown().await.expect("Failed to shutdown server");
}

/// Concurrent senders are all acknowledged and all events arrive.
#[tokio::test]
async fn test_concurrent_notifications() {
    let (server, mut rx) = start_server().await;
    let client = reqwest::Client::new();
    let url = server.webhook_url();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move {
                client
                    .post(url)
                    .body(format!(
                        r#"{{"topic":"mdm.TokenUpdate","checkin_event":{{"udid":"device-{i}"}}}}"#
                    ))
                    .send()
                    .await
            })
        })
        .collect();

    for handle in handles {
        let response = handle.await.expect("Task failed").expect("HTTP request failed");
        assert_eq!(response.status(), 200);
    }

    let mut udids = Vec::new();
    for _ in 0..5 {
        let payload = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("Timeout waiting for payload")
            .expect("No payload received");
        udids.push(payload.event["checkin_event"]["udid"].as_str().unwrap().to_string());
    }
    udids.sort();

    let expected: Vec<String> = (0..5).map(|i| format!("device-{i}")).collect();
    assert_eq!(udids, expected);

    server.shutdown().await.expect("Failed to shutdown server");
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _rx) = start_server().await;

    let response = reqwest::get(format!("http://{}/health", server.local_addr()))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.expect("Failed to read body"), "OK");

    server.shutdown().await.expect("Failed to shutdown server");
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let (server, _rx) = start_server().await;
    let (tx, _rx2) = mpsc::unbounded_channel::<WebhookPayload>();

    let second = WebhookServer::bind(server.local_addr(), tx).await;
    assert!(second.is_err(), "Binding an occupied port should fail");

    server.shutdown().await.expect("Failed to shutdown server");
}
