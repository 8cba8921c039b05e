//! Top-level error types for Vocabuloid.

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::ModelError;
use crate::oauth::AuthorizationError;
use crate::store::StoreError;
use crate::transport::TransportError;

/// Top-level error type encompassing all Vocabuloid errors.
#[derive(Debug, Error)]
pub enum VocabuloidError {
    /// Error from secret storage operations.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error talking to the service.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error during the authorization handshake.
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Error reading the entity graph.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl VocabuloidError {
    /// Whether the failure means the service could not be reached.
    pub fn is_offline(&self) -> bool {
        matches!(
            self,
            VocabuloidError::Transport(TransportError::NetworkUnavailable { .. })
                | VocabuloidError::Model(ModelError::Transport(TransportError::NetworkUnavailable { .. }))
                | VocabuloidError::Authorization(AuthorizationError::NetworkUnavailable { .. })
        )
    }

    /// Whether the failure means the user must sign in (again).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            VocabuloidError::Transport(TransportError::Unauthenticated)
                | VocabuloidError::Model(ModelError::Transport(TransportError::Unauthenticated))
        )
    }
}
