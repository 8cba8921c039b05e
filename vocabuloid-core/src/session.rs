//! Session facade.
//!
//! A [`Session`] wires the credential store, the signed transport and the
//! authorization flow together and exposes what a front end needs: list
//! names, flashcards for a list, and the sign-in lifecycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{ClientConfig, ConfigError, Messages, ServiceConfig};
use crate::credentials::CredentialStore;
use crate::error::VocabuloidError;
use crate::model::{User, VocabularyList};
use crate::oauth::{AuthorizationFlow, AuthorizationState};
use crate::store::create_store;
use crate::transport::{SignedTransport, Transport};

/// Reports whether the service is reachable.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_network_available(&self) -> bool;
}

/// Connectivity that always reports the network as available.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeOnline;

#[async_trait]
impl Connectivity for AssumeOnline {
    async fn is_network_available(&self) -> bool {
        true
    }
}

/// Probes connectivity by opening a TCP connection to the service host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host and port of the configured base URL.
    pub fn for_service(service: &ServiceConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let url = service.endpoint("/")?;
        let host = url.host_str().ok_or_else(|| ConfigError::Invalid {
            message: format!("base URL {} has no host", service.base_url),
        })?;
        let port = url.port_or_known_default().ok_or_else(|| ConfigError::Invalid {
            message: format!("base URL {} has no port", service.base_url),
        })?;
        Ok(Self::new(host, port, timeout))
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_network_available(&self) -> bool {
        let connect = tokio::net::TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("{}:{} unreachable: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                tracing::debug!("{}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}

/// One row of a flashcard view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcard {
    /// The vocabulary word.
    pub front: String,
    /// Translations or conjugations, one per line.
    pub back: String,
}

/// A list rendered for study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcards {
    pub list_id: u64,
    pub heading_from: String,
    pub heading_to: String,
    pub cards: Vec<Flashcard>,
}

impl Flashcards {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

pub struct Session {
    messages: Messages,
    credentials: Arc<CredentialStore>,
    transport: Arc<dyn Transport>,
    flow: AuthorizationFlow,
    connectivity: Arc<dyn Connectivity>,
}

impl Session {
    /// Build a session from configuration: credential backend, signed
    /// transport, authorization flow and a TCP connectivity probe.
    pub fn from_config(config: &ClientConfig) -> Result<Self, VocabuloidError> {
        let credentials = Arc::new(CredentialStore::new(create_store(&config.credentials)?));
        let transport = SignedTransport::new(&config.service, &config.transport, Arc::clone(&credentials))?;
        let flow = AuthorizationFlow::new(&config.service, &config.transport, Arc::clone(&credentials))?;
        let probe = TcpProbe::for_service(&config.service, config.transport.timeout())?;

        Ok(Self::new(config.messages.clone(), credentials, Arc::new(transport), flow)
            .with_connectivity(Arc::new(probe)))
    }

    /// Assemble a session from parts. Connectivity defaults to [`AssumeOnline`].
    pub fn new(
        messages: Messages,
        credentials: Arc<CredentialStore>,
        transport: Arc<dyn Transport>,
        flow: AuthorizationFlow,
    ) -> Self {
        Self {
            messages,
            credentials,
            transport,
            flow,
            connectivity: Arc::new(AssumeOnline),
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// The signed-in user, or `None` when the service returned nothing.
    pub async fn current_user(&self) -> Result<Option<User>, VocabuloidError> {
        Ok(User::current(self.transport()).await?)
    }

    /// A user known by id, without fetching anything.
    pub fn user(&self, id: u64) -> User {
        User::new(id, self.transport())
    }

    /// A list known by id, without fetching anything.
    pub fn list(&self, id: u64) -> VocabularyList {
        VocabularyList::new(id, self.transport())
    }

    /// Names of the user's lists, in service order.
    ///
    /// An empty response yields no names; the next call asks again.
    pub async fn load_user_lists(&self, user: &User) -> Result<Vec<String>, VocabuloidError> {
        let lists = user.lists().await?.unwrap_or_default();
        Ok(lists
            .iter()
            .map(|list| match list.name() {
                Some(name) => name.to_string(),
                None => format!("#{}", list.id()),
            })
            .collect())
    }

    /// Render a list as flashcards.
    ///
    /// Verb lists need a tense selected first (see
    /// [`VocabularyList::select_tense`]). Returns `None` when the list body
    /// came back empty.
    pub async fn select_list(&self, list: &VocabularyList) -> Result<Option<Flashcards>, VocabuloidError> {
        let Some(items) = list.items().await? else {
            return Ok(None);
        };
        let (Some(selector), Some((heading_from, heading_to))) =
            (list.selector().await?, list.headings(&self.messages).await?)
        else {
            return Ok(None);
        };

        let mut cards = Vec::with_capacity(items.len());
        for item in items {
            cards.push(Flashcard {
                front: item.display_word(),
                back: item.formatted(selector, &self.messages).await?,
            });
        }

        tracing::debug!("Rendered {} cards for list {}", cards.len(), list.id());
        Ok(Some(Flashcards {
            list_id: list.id(),
            heading_from,
            heading_to,
            cards,
        }))
    }

    /// Start signing in. Returns the URL the user must open.
    pub async fn begin_authorization(&self) -> Result<url::Url, VocabuloidError> {
        Ok(self.flow.begin_authorization().await?)
    }

    pub async fn complete_authorization(&self, verifier: &str) -> Result<(), VocabuloidError> {
        Ok(self.flow.complete_authorization(verifier).await?)
    }

    pub async fn sign_out(&self) -> Result<(), VocabuloidError> {
        Ok(self.flow.sign_out().await?)
    }

    pub async fn is_authorized(&self) -> Result<bool, VocabuloidError> {
        Ok(self.credentials.is_authorized().await?)
    }

    pub async fn authorization_state(&self) -> Result<AuthorizationState, VocabuloidError> {
        Ok(self.flow.state().await?)
    }

    pub async fn is_network_available(&self) -> bool {
        self.connectivity.is_network_available().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("flow", &self.flow)
            .finish_non_exhaustive()
    }
}
