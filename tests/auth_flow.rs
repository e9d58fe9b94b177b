//! Authentication flow integration tests
//!
//! Drives the login state machine through the public client against a mocked
//! Blink backend.

mod common;

use blink_client::{
    AuthChallengeResult, AuthState, Authentication, BlinkApi, BlinkClient, Error, SessionState,
    types::AuthMode,
};
use chrono::{Duration, Utc};
use common::{ACCOUNT_ID, MockData, TIER, TestConfig, mount_tier_info};
use fake::Fake;
use fake::faker::internet::en::{Password, SafeEmail};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;
use wiremock::matchers::{any, body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn offline_guard(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[rstest]
#[case::empty_email("", "secret")]
#[case::empty_password("someone@example.com", "")]
#[case::both_empty("", "")]
#[tokio::test]
async fn test_login_validation_precedes_network(#[case] email: &str, #[case] password: &str) {
    let server = MockServer::start().await;
    offline_guard(&server).await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    let result = client.login(email, password).await;

    assert!(matches!(result, Err(Error::Validation { .. })));
}

#[rstest]
#[case::precondition_failed(412, AuthChallengeResult::ChallengePending, AuthState::ChallengeIssued)]
#[case::unauthorized(401, AuthChallengeResult::Rejected, AuthState::Unauthenticated)]
#[tokio::test]
async fn test_login_status_mapping(
    #[case] status: u16,
    #[case] expected: AuthChallengeResult,
    #[case] state: AuthState,
) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    let email: String = SafeEmail().fake();
    let password: String = Password(8..16).fake();

    let result = client.login(&email, &password).await.unwrap();
    assert_eq!(result, expected);
    assert_eq!(client.auth_state().await, state);
}

#[tokio::test]
async fn test_login_unexpected_status_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    let error = client.login("me@example.com", "secret").await.unwrap_err();

    match error {
        Error::Protocol {
            operation,
            status,
            reason,
            body,
        } => {
            assert_eq!(operation, "login");
            assert_eq!(status, 429);
            assert_eq!(reason, "Too Many Requests");
            assert_eq!(body, "slow down");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_two_factor_flow_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("2fa-code", "654321"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockData::token_envelope("access-1", "refresh-1", 14400)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header_exists("2fa-code"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_request",
                "error_description": "Verification Code is invalid or expired"
            })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;
    mount_tier_info(&server).await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    assert_eq!(
        client.login("me@example.com", "secret").await.unwrap(),
        AuthChallengeResult::ChallengePending
    );

    assert!(!client.verify_pin("111111").await.unwrap());
    assert_eq!(client.auth_state().await, AuthState::ChallengeIssued);

    let before = Utc::now();
    assert!(client.verify_pin("654321").await.unwrap());
    assert_eq!(client.auth_state().await, AuthState::Authenticated);

    let session = client.session().await;
    assert_eq!(session.tier, TIER);
    assert_eq!(session.account_id, ACCOUNT_ID);
    assert_eq!(session.refresh_token, "refresh-1");
    let valid_until = session.valid_until.unwrap();
    assert!(valid_until >= before + Duration::seconds(14400));
    assert!(valid_until <= Utc::now() + Duration::seconds(14400));

    let rotations = client.drain_token_rotations().await;
    assert_eq!(rotations.len(), 1);
    assert_eq!(rotations[0].refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_verify_pin_requires_prior_login() {
    let server = MockServer::start().await;
    offline_guard(&server).await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    assert!(matches!(
        client.verify_pin("123456").await,
        Err(Error::Validation { .. })
    ));
}

#[rstest]
#[case::bad_request(400)]
#[case::unauthorized(401)]
#[tokio::test]
async fn test_refresh_token_rejection_is_false(#[case] status: u16) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    assert!(!client.login_with_refresh_token("revoked").await.unwrap());
    assert_eq!(client.auth_state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_short_lived_token_refreshed_once_before_protected_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("refresh_token=refresh-0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockData::token_envelope("short", "refresh-1", 60)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockData::token_envelope("long", "refresh-2", 3600)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_tier_info(&server).await;
    Mock::given(method("GET"))
        .and(path(common::Paths::dashboard()))
        .and(header("authorization", "Bearer long"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockData::dashboard(&[(7, 5)])))
        .expect(2)
        .mount(&server)
        .await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    assert!(client.login_with_refresh_token("refresh-0").await.unwrap());
    assert_eq!(client.session().await.access_token, "short");

    // expires_in is inside the look-ahead window, so the first protected
    // call refreshes and the second one reuses the new token
    client.dashboard().await.unwrap();
    client.dashboard().await.unwrap();

    let tokens: Vec<String> = client
        .drain_token_rotations()
        .await
        .into_iter()
        .map(|rotation| rotation.refresh_token)
        .collect();
    assert_eq!(tokens, vec!["refresh-1", "refresh-2"]);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockData::token_envelope("fresh", "refresh-2", 3600))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_tier_info(&server).await;
    Mock::given(method("GET"))
        .and(path(common::Paths::dashboard()))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockData::dashboard(&[(7, 5)])))
        .expect(4)
        .mount(&server)
        .await;

    let client = Arc::new(BlinkClient::new(TestConfig::for_server(&server)).unwrap());
    let expiring = SessionState::preset(AuthMode::OAuth, "stale", TIER, ACCOUNT_ID, 0)
        .with_refresh_token("refresh-1")
        .with_valid_until(Utc::now() + Duration::seconds(10));
    client
        .authenticate(Authentication::PresetSession(expiring))
        .await
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.dashboard().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(client.session().await.access_token, "fresh");
    assert_eq!(client.drain_token_rotations().await.len(), 1);
}

#[tokio::test]
async fn test_rejected_stored_refresh_token_surfaces_auth_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    let expired = SessionState::preset(AuthMode::OAuth, "stale", TIER, ACCOUNT_ID, 0)
        .with_refresh_token("revoked")
        .with_valid_until(Utc::now() - Duration::minutes(5));
    client
        .authenticate(Authentication::PresetSession(expired))
        .await
        .unwrap();

    assert!(matches!(
        client.dashboard().await,
        Err(Error::AuthRejected { .. })
    ));
    assert!(matches!(
        client.dashboard().await,
        Err(Error::NotAuthorized { .. })
    ));
}

#[tokio::test]
async fn test_protected_calls_refused_before_login() {
    let server = MockServer::start().await;
    offline_guard(&server).await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    assert!(matches!(
        client.dashboard().await,
        Err(Error::NotAuthorized { .. })
    ));
    assert!(matches!(
        client.videos().await,
        Err(Error::NotAuthorized { .. })
    ));
}

#[tokio::test]
async fn test_legacy_session_uses_token_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v5/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "account": {"account_id": ACCOUNT_ID, "client_id": 9, "tier": TIER},
            "auth": {"token": "legacy-token"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(common::Paths::dashboard()))
        .and(header("token-auth", "legacy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockData::dashboard(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let client = BlinkClient::new(TestConfig::for_server(&server)).unwrap();
    let result = client
        .login_legacy("me@example.com", "secret", true)
        .await
        .unwrap();
    assert_eq!(result, AuthChallengeResult::Accepted);

    let dashboard = client.dashboard().await.unwrap();
    assert!(dashboard.sync_modules.is_empty());
    assert!(client.drain_token_rotations().await.is_empty());
}
