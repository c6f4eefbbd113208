//! Link, verify and logout against a mocked server

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use savesync_core::domain::{Credential, LinkCode, Verification};
use savesync_core::ports::IIdentityProvider;

use crate::common::{bearer, setup_anonymous_mock, setup_api_mock, TEST_TOKEN};

#[tokio::test]
async fn test_link_exchanges_code_for_credential() {
    let (server, client) = setup_anonymous_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/link"))
        .and(body_json(json!({ "code": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "sessionId": "fresh-session",
            "user": { "id": 42, "username": "ana", "avatar": null, "plan": "pro" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client.link(&LinkCode::new("123456").unwrap()).await.unwrap();

    assert_eq!(session.credential.as_str(), "fresh-session");
    assert_eq!(session.profile.username, "ana");
    assert_eq!(session.profile.plan, "pro");
}

#[tokio::test]
async fn test_link_with_expired_code_fails() {
    let (server, client) = setup_anonymous_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/link"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid or expired code" })),
        )
        .mount(&server)
        .await;

    let err = client
        .link(&LinkCode::new("999999").unwrap())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Invalid or expired code"));
}

#[tokio::test]
async fn test_verify_valid_credential() {
    let (server, client) = setup_anonymous_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .and(header("authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": true,
            "user": { "id": 1, "username": "ana", "plan": "free" }
        })))
        .mount(&server)
        .await;

    let verification = client
        .verify(&Credential::new(TEST_TOKEN).unwrap())
        .await
        .unwrap();

    match verification {
        Verification::Valid(profile) => assert_eq!(profile.username, "ana"),
        Verification::Invalid => panic!("expected a valid session"),
    }
}

#[tokio::test]
async fn test_verify_unauthorized_is_invalid_not_error() {
    let (server, client) = setup_anonymous_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid session" })))
        .mount(&server)
        .await;

    let verification = client
        .verify(&Credential::new("revoked").unwrap())
        .await
        .unwrap();
    assert_eq!(verification, Verification::Invalid);
}

#[tokio::test]
async fn test_verify_server_error_is_error() {
    let (server, client) = setup_anonymous_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client
        .verify(&Credential::new(TEST_TOKEN).unwrap())
        .await
        .is_err());
}

#[tokio::test]
async fn test_logout_sends_bearer() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .logout(&Credential::new(TEST_TOKEN).unwrap())
        .await
        .unwrap();
}
