//! OAuth-signed HTTP transport.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use url::Url;

use super::{JsonObject, Transport, TransportError, parse_collection, parse_object};
use crate::config::{ConfigError, ServiceConfig, TransportConfig};
use crate::credentials::CredentialStore;
use crate::oauth::{Consumer, Signer};

/// Issues GET requests signed with the stored access token.
///
/// The credential snapshot is taken fresh for every request and held stable
/// until the response body has been read. Nothing is retried.
pub struct SignedTransport {
    service: ServiceConfig,
    consumer: Consumer,
    credentials: Arc<CredentialStore>,
    http: reqwest::Client,
}

impl SignedTransport {
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

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.service
            .endpoint(path)
            .map_err(|e| TransportError::MalformedBody {
                message: format!("cannot build request URL: {}", e),
            })
    }

    async fn get_body(&self, path: &str) -> Result<String, TransportError> {
        let url = self.url_for(path)?;

        let guard = self
            .credentials
            .signing()
            .await
            .map_err(|e| TransportError::Credentials {
                message: e.to_string(),
            })?;

        let access = guard
            .credentials()
            .access
            .as_ref()
            .ok_or(TransportError::Unauthenticated)?;

        let header = Signer::new(&self.consumer, Some(access)).authorization_header("GET", &url, &[]);

        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, header)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Service rejected signed request to {}", url);
            return Err(TransportError::Unauthenticated);
        }
        if !status.is_success() {
            tracing::debug!("GET {} failed with {}", url, status);
            return Err(TransportError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(map_request_error)?;
        drop(guard);

        Ok(body)
    }
}

fn map_request_error(e: reqwest::Error) -> TransportError {
    if e.is_decode() || e.is_body() {
        TransportError::MalformedBody {
            message: e.to_string(),
        }
    } else {
        TransportError::NetworkUnavailable {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Debug for SignedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedTransport")
            .field("base_url", &self.service.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for SignedTransport {
    async fn fetch_object(&self, path: &str) -> Result<Option<JsonObject>, TransportError> {
        parse_object(&self.get_body(path).await?)
    }

    async fn fetch_collection(&self, path: &str) -> Result<Option<Vec<Value>>, TransportError> {
        parse_collection(&self.get_body(path).await?)
    }
}
