//! Common test utilities and helpers
//!
//! This module provides a mocked Blink backend and client factories shared by
//! the integration tests.

#![allow(dead_code)]

use blink_client::{
    Authentication, BlinkApi, BlinkClient, SessionState,
    config::Settings,
    types::AuthMode,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT_ID: u64 = 1234;
pub const TIER: &str = "u011";

/// Test configuration factory
pub struct TestConfig;

impl TestConfig {
    /// Settings pointing every host at the mock server, with no settle delay
    pub fn for_server(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.api.auth_base_url = server.uri();
        settings.api.tier_url_template = server.uri();
        settings.video.settle_delay_ms = 0;
        settings.network.connect_timeout = 5;
        settings.network.request_timeout = Some(10);
        settings.logging.level = "debug".to_string();
        settings
    }
}

/// Test data factory
pub struct MockData;

impl MockData {
    /// Token grant response
    pub fn token_envelope(access: &str, refresh: &str, expires_in: i64) -> Value {
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": expires_in,
            "scope": "client",
            "token_type": "Bearer"
        })
    }

    /// Tier lookup response for the test account
    pub fn tier_info() -> Value {
        json!({"tier": TIER, "account_id": ACCOUNT_ID, "tulsa_id": 77})
    }

    /// Dashboard listing the given `(module_id, network_id)` pairs
    pub fn dashboard(modules: &[(u64, u64)]) -> Value {
        let sync_modules: Vec<Value> = modules
            .iter()
            .map(|(id, network_id)| {
                json!({"id": id, "network_id": network_id, "name": format!("Module {}", id)})
            })
            .collect();
        json!({"account": {"id": ACCOUNT_ID}, "networks": [], "sync_modules": sync_modules})
    }

    /// Manifest listing clips with the given ids
    pub fn manifest(manifest_id: &str, clip_ids: &[&str]) -> Value {
        let clips: Vec<Value> = clip_ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "size": "2048",
                    "camera_name": "Porch",
                    "created_at": "2024-05-01T10:00:00-04:00"
                })
            })
            .collect();
        json!({"version": "1.0", "manifest_id": manifest_id, "clips": clips})
    }
}

/// API paths for the test account
pub struct Paths;

impl Paths {
    pub fn dashboard() -> String {
        format!("/api/v3/accounts/{}/homescreen", ACCOUNT_ID)
    }

    pub fn manifest_request(network_id: u64, module_id: u64) -> String {
        format!(
            "/api/v1/accounts/{}/networks/{}/sync_modules/{}/local_storage/manifest/request",
            ACCOUNT_ID, network_id, module_id
        )
    }

    pub fn clip(network_id: u64, module_id: u64, manifest_id: &str, action: &str, clip_id: &str) -> String {
        format!(
            "/api/v1/accounts/{}/networks/{}/sync_modules/{}/local_storage/manifest/{}/clip/{}/{}",
            ACCOUNT_ID, network_id, module_id, manifest_id, action, clip_id
        )
    }
}

/// Mount the tier lookup used by every successful OAuth grant
pub async fn mount_tier_info(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/tier_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockData::tier_info()))
        .mount(server)
        .await;
}

/// Mount a manifest request/poll pair for one module
pub async fn mount_manifest(server: &MockServer, network_id: u64, module_id: u64, manifest_id: &str, clip_ids: &[&str]) {
    let request = Paths::manifest_request(network_id, module_id);
    Mock::given(method("POST"))
        .and(path(request.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": manifest_id, "network_id": network_id})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", request, manifest_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockData::manifest(manifest_id, clip_ids)))
        .mount(server)
        .await;
}

/// Client for the mock server with an authenticated preset session
pub async fn authenticated_client(server: &MockServer) -> BlinkClient {
    let client = BlinkClient::new(TestConfig::for_server(server)).unwrap();
    let session = SessionState::preset(AuthMode::OAuth, "access-token", TIER, ACCOUNT_ID, 0)
        .with_refresh_token("refresh-token")
        .with_valid_until(Utc::now() + Duration::hours(1));
    client
        .authenticate(Authentication::PresetSession(session))
        .await
        .unwrap();
    client
}
