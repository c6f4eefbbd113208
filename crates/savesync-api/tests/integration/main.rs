//! Integration tests for savesync-api
//!
//! Uses wiremock to simulate the SaveSync server and verifies the
//! ApiClient port implementations end to end.

mod common;

mod test_auth;
mod test_saves;
mod test_sync_requests;
