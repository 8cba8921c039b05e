//! Integration tests for the three-legged authorization handshake.
//!
//! These tests verify that the AuthorizationFlow correctly:
//! - Obtains and stores a request token
//! - Builds the authorization URL
//! - Exchanges the verifier for an access token and drops the request token
//! - Leaves stored credentials untouched on every failure

use std::sync::Arc;

use vocabuloid_core::{
    AuthorizationError, AuthorizationFlow, AuthorizationState, ClientConfig, CredentialStore,
    Credentials, MemoryStore, Secret, TokenPair, TokenSlot,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header_exists, method, path},
};

/// Helper to create a flow against the mock server.
fn setup_flow(base_url: &str) -> (AuthorizationFlow, Arc<CredentialStore>) {
    let mut config = ClientConfig::default();
    config.service.base_url = base_url.to_string();
    config.service.consumer_key = "test-consumer".to_string();
    config.service.consumer_secret = Secret::new("test-consumer-secret");

    let credentials = Arc::new(CredentialStore::new(Box::new(MemoryStore::new())));
    let flow =
        AuthorizationFlow::new(&config.service, &config.transport, Arc::clone(&credentials)).unwrap();
    (flow, credentials)
}

async fn mount_request_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/request_token"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "oauth_token=req-token&oauth_token_secret=req-secret&oauth_callback_confirmed=true",
        ))
        .mount(server)
        .await;
}

fn authorization_header(request: &wiremock::Request) -> String {
    request
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_begin_authorization_stores_request_token() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    let (flow, credentials) = setup_flow(&server.uri());

    let url = flow.begin_authorization().await.unwrap();

    assert_eq!(
        url.as_str(),
        format!("{}/oauth/authorize?oauth_token=req-token", server.uri())
    );
    let stored = credentials.get().await.unwrap();
    assert_eq!(stored.request, Some(TokenPair::new("req-token", "req-secret")));
    assert!(stored.access.is_none());
    assert_eq!(flow.state().await.unwrap(), AuthorizationState::RequestTokenObtained);

    let requests = server.received_requests().await.unwrap();
    let header = authorization_header(&requests[0]);
    assert!(header.contains("oauth_callback=\"oob\""));
    assert!(!header.contains("oauth_token="));
}

#[tokio::test]
async fn test_complete_authorization_exchanges_verifier() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=acc-token&oauth_token_secret=acc-secret"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (flow, credentials) = setup_flow(&server.uri());

    flow.begin_authorization().await.unwrap();
    flow.complete_authorization("v123").await.unwrap();

    let stored = credentials.get().await.unwrap();
    assert_eq!(stored.access, Some(TokenPair::new("acc-token", "acc-secret")));
    assert!(stored.request.is_none(), "request token should be discarded");
    assert_eq!(flow.state().await.unwrap(), AuthorizationState::Authorized);

    let requests = server.received_requests().await.unwrap();
    let exchange = requests
        .iter()
        .find(|r| r.url.path() == "/oauth/access_token")
        .unwrap();
    let header = authorization_header(exchange);
    assert!(header.contains("oauth_token=\"req-token\""));
    assert!(header.contains("oauth_verifier=\"v123\""));
}

#[tokio::test]
async fn test_complete_without_begin_is_rejected_locally() {
    let server = MockServer::start().await;
    let (flow, credentials) = setup_flow(&server.uri());

    let result = flow.complete_authorization("v123").await;

    assert!(matches!(result, Err(AuthorizationError::NoPendingRequestToken)));
    assert_eq!(credentials.get().await.unwrap(), Credentials::default());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_exchange_keeps_request_token() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("oauth_problem=verifier_invalid"))
        .mount(&server)
        .await;
    let (flow, credentials) = setup_flow(&server.uri());

    flow.begin_authorization().await.unwrap();
    let before = credentials.get().await.unwrap();

    let result = flow.complete_authorization("wrong").await;

    match result {
        Err(AuthorizationError::ExchangeRejected { message }) => {
            assert!(message.contains("verifier_invalid"));
        }
        other => panic!("Expected ExchangeRejected, got {:?}", other),
    }
    assert_eq!(credentials.get().await.unwrap(), before);
    assert_eq!(flow.state().await.unwrap(), AuthorizationState::RequestTokenObtained);
}

#[tokio::test]
async fn test_failed_request_token_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/request_token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (flow, credentials) = setup_flow(&server.uri());

    let result = flow.begin_authorization().await;

    assert!(matches!(result, Err(AuthorizationError::ExchangeRejected { .. })));
    assert_eq!(credentials.get().await.unwrap(), Credentials::default());
}

#[tokio::test]
async fn test_restart_overwrites_pending_request_token() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    let (flow, credentials) = setup_flow(&server.uri());
    credentials
        .put(TokenSlot::Request, &TokenPair::new("stale-token", "stale-secret"))
        .await
        .unwrap();

    flow.begin_authorization().await.unwrap();

    let stored = credentials.get().await.unwrap();
    assert_eq!(stored.request, Some(TokenPair::new("req-token", "req-secret")));
}

#[tokio::test]
async fn test_unreachable_service() {
    let (flow, credentials) = setup_flow("http://127.0.0.1:9");

    let result = flow.begin_authorization().await;

    assert!(matches!(result, Err(AuthorizationError::NetworkUnavailable { .. })));
    assert_eq!(credentials.get().await.unwrap(), Credentials::default());
}

#[tokio::test]
async fn test_sign_out_after_authorization() {
    let server = MockServer::start().await;
    mount_request_token(&server).await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=acc-token&oauth_token_secret=acc-secret"),
        )
        .mount(&server)
        .await;
    let (flow, _credentials) = setup_flow(&server.uri());

    flow.begin_authorization().await.unwrap();
    flow.complete_authorization("v123").await.unwrap();
    assert!(flow.is_authorized().await.unwrap());

    flow.sign_out().await.unwrap();

    assert!(!flow.is_authorized().await.unwrap());
    assert_eq!(flow.state().await.unwrap(), AuthorizationState::Unauthenticated);
}
