//! Shared test helpers for SaveSync API integration tests

use std::time::Duration;

use wiremock::MockServer;

use savesync_api::client::ApiClient;
use savesync_core::domain::{Credential, ResourceId};

pub const TEST_TOKEN: &str = "test-session-token";

/// Starts a mock server and returns a client authenticated with
/// [`TEST_TOKEN`] pointing at it
pub async fn setup_api_mock() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_credential(Credential::new(TEST_TOKEN).unwrap());
    (server, client)
}

/// Same as [`setup_api_mock`] but without a credential
pub async fn setup_anonymous_mock() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    (server, client)
}

pub fn resource(id: &str) -> ResourceId {
    ResourceId::new(id).unwrap()
}

pub fn bearer() -> String {
    format!("Bearer {TEST_TOKEN}")
}
