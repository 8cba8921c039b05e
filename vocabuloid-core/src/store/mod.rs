//! Where the OAuth credential keys live.
//!
//! Credentials are four string keys under the `vocabuloid/` prefix
//! (`requestToken`, `requestSecret`, `accessToken`, `accessSecret`). A
//! [`SecretStore`] maps those keys to [`Secret`] values; the backend is picked
//! from the `[credentials]` table of the configuration by [`create_store`].
//!
//! ```rust,ignore
//! let store = create_store(&StoreBackend::Memory)?;
//! store.set("vocabuloid/accessToken", &Secret::new("nnch734d00sl2jdk")).await?;
//! assert!(store.exists("vocabuloid/accessToken").await?);
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod file;
mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;

/// A token or token secret.
///
/// Formats as `[REDACTED]` and is zeroed on drop; read it with
/// [`expose`](Secret::expose) only where it goes into a signature.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Failure reading or writing credential keys.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The credentials file is not valid JSON.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// No platform configuration directory could be determined.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,
}

/// Key/value backend for credential keys.
///
/// A missing key reads as `Ok(None)`, `set` overwrites and `delete` of an
/// absent key succeeds.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError>;

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Which backend holds the credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local memory. Credentials are lost on exit.
    Memory,

    /// JSON file. `None` means the default path in the platform config dir.
    File {
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// OS keyring, under the given service name.
    Keyring {
        #[serde(default = "default_keyring_service")]
        service: String,
    },
}

fn default_keyring_service() -> String {
    "vocabuloid".to_string()
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::File { path: None }
    }
}

/// Open the configured backend.
///
/// A keyring that cannot be reached, or a build without the `keyring-store`
/// feature, degrades to [`MemoryStore`] with a warning rather than failing.
pub fn create_store(backend: &StoreBackend) -> Result<Box<dyn SecretStore>, StoreError> {
    match backend {
        StoreBackend::Memory => {
            tracing::debug!("Credentials kept in memory only");
            Ok(Box::new(MemoryStore::new()))
        }
        StoreBackend::File { path } => {
            let path = match path {
                Some(p) => p.clone(),
                None => FileStore::default_path()?,
            };
            tracing::debug!("Credentials file: {:?}", path);
            Ok(Box::new(FileStore::open(path)?))
        }
        StoreBackend::Keyring { service } => Ok(keyring_or_memory(service)),
    }
}

#[cfg(feature = "keyring-store")]
fn keyring_or_memory(service: &str) -> Box<dyn SecretStore> {
    match KeyringStore::try_new(service) {
        Ok(store) => {
            tracing::info!("Credentials kept in the OS keyring under {}", service);
            Box::new(store)
        }
        Err(e) => {
            tracing::warn!("Keyring unavailable ({}); you will need to sign in again next run", e);
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(not(feature = "keyring-store"))]
fn keyring_or_memory(_service: &str) -> Box<dyn SecretStore> {
    tracing::warn!("Built without keyring-store; credentials are kept in memory only");
    Box::new(MemoryStore::new())
}
