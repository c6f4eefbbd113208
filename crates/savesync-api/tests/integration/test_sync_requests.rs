//! Remote command polling and completion reports

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use savesync_core::domain::{CommandKind, CredentialRejected, RemoteCommand};
use savesync_core::ports::ICommandChannel;

use crate::common::setup_api_mock;

#[tokio::test]
async fn test_poll_returns_pending_commands_in_order() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/sync-requests/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "requests": [
                { "id": 3, "user_id": 1, "request_type": "sync", "created_at": "2024-01-01", "processed": 0 },
                { "id": 4, "user_id": 1, "request_type": "pull", "created_at": "2024-01-01", "processed": 0 },
                { "id": 5, "user_id": 1, "request_type": "wipe", "created_at": "2024-01-01", "processed": 0 }
            ]
        })))
        .mount(&server)
        .await;

    let commands = client.poll().await.unwrap();
    assert_eq!(
        commands,
        vec![
            RemoteCommand::new(3, CommandKind::Sync),
            RemoteCommand::new(4, CommandKind::Pull),
            RemoteCommand::new(5, CommandKind::Unknown),
        ]
    );
}

#[tokio::test]
async fn test_poll_empty() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/sync-requests/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "requests": [] })))
        .mount(&server)
        .await;

    assert!(client.poll().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_unauthorized_is_error() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/sync-requests/pending"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid session" })))
        .mount(&server)
        .await;

    let err = client.poll().await.unwrap_err();
    assert!(CredentialRejected::in_chain(&err));
}

#[tokio::test]
async fn test_poll_server_error_is_not_a_rejection() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/sync-requests/pending"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.poll().await.unwrap_err();
    assert!(!CredentialRejected::in_chain(&err));
}

#[tokio::test]
async fn test_report_completion_body() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/sync-requests/complete"))
        .and(body_json(json!({ "requestType": "pull", "success": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .report_completion(CommandKind::Pull, false)
        .await
        .unwrap();
}
