//! The persisted OAuth credential pair.
//!
//! This module provides:
//! - [`CredentialKey`] - The four persisted key names
//! - [`TokenPair`] - A token and its secret
//! - [`Credentials`] - Snapshot of both slots (request and access)
//! - [`CredentialStore`] - Reads and writes the slots over a [`SecretStore`]
//!
//! Reads used for signing hold a shared guard for the whole sign-and-send
//! operation ([`CredentialStore::signing`]); writes take the exclusive side,
//! so a request never observes half of a token refresh or sign-out.

use std::fmt;

use tokio::sync::{RwLock, RwLockReadGuard};

use crate::store::{Secret, SecretStore, StoreError};

/// Namespace prefix for every persisted key.
pub const NAMESPACE: &str = "vocabuloid";

/// Names under which credential material is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    RequestToken,
    RequestSecret,
    AccessToken,
    AccessSecret,
}

impl CredentialKey {
    /// All four keys.
    pub const ALL: [CredentialKey; 4] = [
        CredentialKey::RequestToken,
        CredentialKey::RequestSecret,
        CredentialKey::AccessToken,
        CredentialKey::AccessSecret,
    ];

    /// Get the key name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::RequestToken => "requestToken",
            CredentialKey::RequestSecret => "requestSecret",
            CredentialKey::AccessToken => "accessToken",
            CredentialKey::AccessSecret => "accessSecret",
        }
    }

    /// Full backend key, e.g. `vocabuloid/accessToken`.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", NAMESPACE, self.as_str())
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which of the two token slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSlot {
    /// Temporary token between starting and completing authorization.
    Request,
    /// Long-lived token used to sign resource requests.
    Access,
}

impl TokenSlot {
    /// The `(token, secret)` keys backing this slot.
    pub fn keys(&self) -> [CredentialKey; 2] {
        match self {
            TokenSlot::Request => [CredentialKey::RequestToken, CredentialKey::RequestSecret],
            TokenSlot::Access => [CredentialKey::AccessToken, CredentialKey::AccessSecret],
        }
    }
}

/// An OAuth token and its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: Secret,
    pub secret: Secret,
}

impl TokenPair {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token),
            secret: Secret::new(secret),
        }
    }
}

/// Snapshot of both credential slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub request: Option<TokenPair>,
    pub access: Option<TokenPair>,
}

impl Credentials {
    /// Whether an access pair is present. Only then may requests be signed.
    pub fn is_authorized(&self) -> bool {
        self.access.is_some()
    }

    /// Whether an authorization has been started but not completed.
    pub fn has_pending_request(&self) -> bool {
        self.request.is_some()
    }

    pub fn slot(&self, slot: TokenSlot) -> Option<&TokenPair> {
        match slot {
            TokenSlot::Request => self.request.as_ref(),
            TokenSlot::Access => self.access.as_ref(),
        }
    }
}

/// Process-wide holder of the credential pair.
pub struct CredentialStore {
    backend: Box<dyn SecretStore>,
    gate: RwLock<()>,
}

/// Credentials held stable for the duration of one signed request.
///
/// Writers wait until every outstanding guard is dropped.
pub struct SigningGuard<'a> {
    _gate: RwLockReadGuard<'a, ()>,
    credentials: Credentials,
}

impl SigningGuard<'_> {
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl CredentialStore {
    pub fn new(backend: Box<dyn SecretStore>) -> Self {
        Self {
            backend,
            gate: RwLock::new(()),
        }
    }

    /// Read both slots.
    pub async fn get(&self) -> Result<Credentials, StoreError> {
        let _gate = self.gate.read().await;
        self.read_unlocked().await
    }

    /// Read both slots and keep them stable until the guard is dropped.
    pub async fn signing(&self) -> Result<SigningGuard<'_>, StoreError> {
        let gate = self.gate.read().await;
        let credentials = self.read_unlocked().await?;
        Ok(SigningGuard {
            _gate: gate,
            credentials,
        })
    }

    /// Whether an access pair is stored.
    pub async fn is_authorized(&self) -> Result<bool, StoreError> {
        Ok(self.get().await?.is_authorized())
    }

    /// Store `pair` under `slot`, replacing any previous value.
    pub async fn put(&self, slot: TokenSlot, pair: &TokenPair) -> Result<(), StoreError> {
        self.replace(slot, pair, &[]).await
    }

    /// Remove the given keys. Missing keys are ignored.
    pub async fn clear(&self, keys: &[CredentialKey]) -> Result<(), StoreError> {
        let _gate = self.gate.write().await;
        for key in keys {
            self.backend.delete(&key.storage_key()).await?;
        }
        tracing::debug!("Cleared credential keys {:?}", keys);
        Ok(())
    }

    /// Store `pair` under `slot` and remove `clear` in one exclusive section.
    pub async fn replace(
        &self,
        slot: TokenSlot,
        pair: &TokenPair,
        clear: &[CredentialKey],
    ) -> Result<(), StoreError> {
        let _gate = self.gate.write().await;
        let [token_key, secret_key] = slot.keys();
        self.backend.set(&token_key.storage_key(), &pair.token).await?;
        self.backend.set(&secret_key.storage_key(), &pair.secret).await?;
        for key in clear {
            self.backend.delete(&key.storage_key()).await?;
        }
        tracing::debug!("Stored {:?} token pair", slot);
        Ok(())
    }

    async fn read_unlocked(&self) -> Result<Credentials, StoreError> {
        Ok(Credentials {
            request: self.read_pair(TokenSlot::Request).await?,
            access: self.read_pair(TokenSlot::Access).await?,
        })
    }

    async fn read_pair(&self, slot: TokenSlot) -> Result<Option<TokenPair>, StoreError> {
        let [token_key, secret_key] = slot.keys();
        let token = self.backend.get(&token_key.storage_key()).await?;
        let secret = self.backend.get(&secret_key.storage_key()).await?;

        match (token, secret) {
            (Some(token), Some(secret)) => Ok(Some(TokenPair { token, secret })),
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("Incomplete {:?} token pair in store, treating as absent", slot);
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> CredentialStore {
        CredentialStore::new(Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_storage_keys() {
        let keys: Vec<String> = CredentialKey::ALL.iter().map(|k| k.storage_key()).collect();
        assert_eq!(
            keys,
            vec![
                "vocabuloid/requestToken",
                "vocabuloid/requestSecret",
                "vocabuloid/accessToken",
                "vocabuloid/accessSecret",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_store_is_unauthorized() {
        let store = store();
        let creds = store.get().await.unwrap();
        assert_eq!(creds, Credentials::default());
        assert!(!store.is_authorized().await.unwrap());
    }

    #[tokio::test]
    async fn test_put_and_clear_access_pair() {
        let store = store();
        store
            .put(TokenSlot::Access, &TokenPair::new("token", "secret"))
            .await
            .unwrap();
        assert!(store.is_authorized().await.unwrap());

        store
            .clear(&TokenSlot::Access.keys())
            .await
            .unwrap();
        assert!(!store.is_authorized().await.unwrap());
    }

    #[tokio::test]
    async fn test_half_pair_is_absent() {
        let backend = MemoryStore::new();
        backend
            .set(&CredentialKey::AccessToken.storage_key(), &Secret::new("token"))
            .await
            .unwrap();
        let store = CredentialStore::new(Box::new(backend));

        assert!(store.get().await.unwrap().access.is_none());
    }

    #[tokio::test]
    async fn test_replace_swaps_request_for_access() {
        let store = store();
        store
            .put(TokenSlot::Request, &TokenPair::new("req", "req-secret"))
            .await
            .unwrap();

        store
            .replace(
                TokenSlot::Access,
                &TokenPair::new("acc", "acc-secret"),
                &TokenSlot::Request.keys(),
            )
            .await
            .unwrap();

        let creds = store.get().await.unwrap();
        assert!(creds.request.is_none());
        assert_eq!(creds.access.unwrap().token.expose(), "acc");
    }

    #[tokio::test]
    async fn test_writer_waits_for_signing_guard() {
        let store = Arc::new(store());
        store
            .put(TokenSlot::Access, &TokenPair::new("old", "old-secret"))
            .await
            .unwrap();

        let guard = store.signing().await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.clear(&TokenSlot::Access.keys()).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());
        assert_eq!(
            guard.credentials().access.as_ref().unwrap().token.expose(),
            "old"
        );

        drop(guard);
        writer.await.unwrap().unwrap();
        assert!(!store.is_authorized().await.unwrap());
    }
}
