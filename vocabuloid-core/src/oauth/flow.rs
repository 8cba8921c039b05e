//! Three-legged OAuth 1.0a authorization.
//!
//! # Flow Overview
//!
//! 1. Request a temporary token from the service, signed with the consumer
//!    credentials only, and store it in the request-token slot
//! 2. Send the user to the authorization URL built from that token
//! 3. The user approves the application and receives a verifier
//! 4. Exchange the request token and verifier for an access token, store it,
//!    and discard the request token
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use vocabuloid_core::config::ClientConfig;
//! use vocabuloid_core::credentials::CredentialStore;
//! use vocabuloid_core::oauth::AuthorizationFlow;
//! use vocabuloid_core::store::MemoryStore;
//!
//! let config = ClientConfig::default();
//! let credentials = Arc::new(CredentialStore::new(Box::new(MemoryStore::new())));
//! let flow = AuthorizationFlow::new(&config.service, &config.transport, credentials)?;
//!
//! let url = flow.begin_authorization().await?;
//! println!("Open {} and paste the verifier", url);
//!
//! flow.complete_authorization("verifier-from-user").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::{Consumer, Signer};
use crate::config::{ConfigError, ServiceConfig, TransportConfig};
use crate::credentials::{CredentialStore, TokenPair, TokenSlot};
use crate::store::StoreError;

/// Where the handshake currently stands, derived from stored credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    Unauthenticated,
    RequestTokenObtained,
    Authorized,
}

impl std::fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AuthorizationState::Unauthenticated => "unauthenticated",
            AuthorizationState::RequestTokenObtained => "awaiting verifier",
            AuthorizationState::Authorized => "authorized",
        };
        f.write_str(label)
    }
}

/// Errors from the authorization handshake.
///
/// Every failure leaves the stored credentials as they were.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// `complete_authorization` was called without a stored request token.
    #[error("no pending request token; start the authorization first")]
    NoPendingRequestToken,

    /// The service refused the token request or the exchange.
    #[error("token exchange rejected: {message}")]
    ExchangeRejected { message: String },

    /// The service could not be reached.
    #[error("network unavailable: {message}")]
    NetworkUnavailable { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Runs the handshake against the configured service and records its
/// outcome in the [`CredentialStore`].
pub struct AuthorizationFlow {
    service: ServiceConfig,
    consumer: Consumer,
    credentials: Arc<CredentialStore>,
    http: reqwest::Client,
}

impl AuthorizationFlow {
    pub fn new(
        service: &ServiceConfig,
        transport: &TransportConfig,
        credentials: Arc<CredentialStore>,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(transport.timeout())
            .user_agent(transport.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            service: service.clone(),
            consumer: service.consumer(),
            credentials,
            http,
        })
    }

    pub async fn state(&self) -> Result<AuthorizationState, AuthorizationError> {
        let credentials = self.credentials.get().await?;
        Ok(if credentials.is_authorized() {
            AuthorizationState::Authorized
        } else if credentials.has_pending_request() {
            AuthorizationState::RequestTokenObtained
        } else {
            AuthorizationState::Unauthenticated
        })
    }

    pub async fn is_authorized(&self) -> Result<bool, AuthorizationError> {
        Ok(self.credentials.is_authorized().await?)
    }

    /// Obtain a request token and return the URL the user must visit.
    ///
    /// A request token left over from an earlier, unfinished attempt is
    /// replaced.
    pub async fn begin_authorization(&self) -> Result<Url, AuthorizationError> {
        let endpoint = self.service.endpoint(&self.service.request_token_path)?;
        let pair = self
            .request_token(&endpoint, None, &[("oauth_callback", self.service.callback.as_str())])
            .await?;

        if self.credentials.get().await?.has_pending_request() {
            tracing::warn!("Replacing pending request token from an unfinished authorization");
        }
        self.credentials.put(TokenSlot::Request, &pair).await?;

        let mut url = self.service.endpoint(&self.service.authorize_path)?;
        url.query_pairs_mut()
            .append_pair("oauth_token", pair.token.expose());

        tracing::info!("Obtained request token, awaiting user authorization");
        Ok(url)
    }

    /// Exchange the pending request token and `verifier` for an access token.
    pub async fn complete_authorization(&self, verifier: &str) -> Result<(), AuthorizationError> {
        let request = self
            .credentials
            .get()
            .await?
            .request
            .ok_or(AuthorizationError::NoPendingRequestToken)?;

        let endpoint = self.service.endpoint(&self.service.access_token_path)?;
        let access = self
            .request_token(&endpoint, Some(&request), &[("oauth_verifier", verifier)])
            .await?;

        self.credentials
            .replace(TokenSlot::Access, &access, &TokenSlot::Request.keys())
            .await?;

        tracing::info!("Authorization complete");
        Ok(())
    }

    /// Forget the access token. A pending request token is left alone.
    pub async fn sign_out(&self) -> Result<(), AuthorizationError> {
        self.credentials.clear(&TokenSlot::Access.keys()).await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// POST a signed token request and parse the form-encoded token pair.
    async fn request_token(
        &self,
        endpoint: &Url,
        token: Option<&TokenPair>,
        extra: &[(&str, &str)],
    ) -> Result<TokenPair, AuthorizationError> {
        let header = Signer::new(&self.consumer, token).authorization_header("POST", endpoint, extra);

        tracing::debug!("POST {}", endpoint);

        let response = self
            .http
            .post(endpoint.clone())
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| AuthorizationError::NetworkUnavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthorizationError::NetworkUnavailable {
                message: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(AuthorizationError::ExchangeRejected {
                message: format!("{} returned {}: {}", endpoint.path(), status, body.trim()),
            });
        }

        parse_token_response(&body)
    }
}

impl std::fmt::Debug for AuthorizationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationFlow")
            .field("base_url", &self.service.base_url)
            .finish_non_exhaustive()
    }
}

/// Parse `oauth_token=...&oauth_token_secret=...`.
fn parse_token_response(body: &str) -> Result<TokenPair, AuthorizationError> {
    let mut token = None;
    let mut secret = None;

    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            "oauth_callback_confirmed" if value != "true" => {
                tracing::warn!("Service did not confirm the callback");
            }
            _ => {}
        }
    }

    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() => Ok(TokenPair::new(token, secret)),
        _ => Err(AuthorizationError::ExchangeRejected {
            message: "response did not contain oauth_token and oauth_token_secret".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::credentials::Credentials;
    use crate::store::MemoryStore;

    fn flow() -> (AuthorizationFlow, Arc<CredentialStore>) {
        let config = ClientConfig::default();
        let credentials = Arc::new(CredentialStore::new(Box::new(MemoryStore::new())));
        let flow = AuthorizationFlow::new(&config.service, &config.transport, credentials.clone()).unwrap();
        (flow, credentials)
    }

    #[test]
    fn test_parse_token_response() {
        let pair = parse_token_response(
            "oauth_token=hh5s93j4hdidpola&oauth_token_secret=hdhd0244k9j7ao03&oauth_callback_confirmed=true",
        )
        .unwrap();
        assert_eq!(pair.token.expose(), "hh5s93j4hdidpola");
        assert_eq!(pair.secret.expose(), "hdhd0244k9j7ao03");
    }

    #[test]
    fn test_parse_token_response_decodes_values() {
        let pair = parse_token_response("oauth_token=a%2Bb&oauth_token_secret=c%3Dd\n").unwrap();
        assert_eq!(pair.token.expose(), "a+b");
        assert_eq!(pair.secret.expose(), "c=d");
    }

    #[test]
    fn test_parse_token_response_missing_fields() {
        for body in ["", "oauth_token=abc", "oauth_problem=token_rejected"] {
            assert!(matches!(
                parse_token_response(body),
                Err(AuthorizationError::ExchangeRejected { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_complete_without_begin() {
        let (flow, credentials) = flow();

        let result = flow.complete_authorization("1234").await;
        assert!(matches!(result, Err(AuthorizationError::NoPendingRequestToken)));
        assert_eq!(credentials.get().await.unwrap(), Credentials::default());
    }

    #[tokio::test]
    async fn test_state_follows_store() {
        let (flow, credentials) = flow();
        assert_eq!(flow.state().await.unwrap(), AuthorizationState::Unauthenticated);

        credentials
            .put(TokenSlot::Request, &TokenPair::new("req", "req-secret"))
            .await
            .unwrap();
        assert_eq!(flow.state().await.unwrap(), AuthorizationState::RequestTokenObtained);

        credentials
            .put(TokenSlot::Access, &TokenPair::new("acc", "acc-secret"))
            .await
            .unwrap();
        assert_eq!(flow.state().await.unwrap(), AuthorizationState::Authorized);
        assert!(flow.is_authorized().await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_keeps_request_slot() {
        let (flow, credentials) = flow();
        credentials
            .put(TokenSlot::Request, &TokenPair::new("req", "req-secret"))
            .await
            .unwrap();
        credentials
            .put(TokenSlot::Access, &TokenPair::new("acc", "acc-secret"))
            .await
            .unwrap();

        flow.sign_out().await.unwrap();

        let stored = credentials.get().await.unwrap();
        assert!(stored.access.is_none());
        assert!(stored.request.is_some());
        assert_eq!(flow.state().await.unwrap(), AuthorizationState::RequestTokenObtained);
    }
}
