//! Credential keys in the platform keyring (Keychain, Secret Service,
//! Credential Manager).

use async_trait::async_trait;
use keyring::Entry;

use super::{Secret, SecretStore, StoreError};

/// Keeps each credential key as a separate keyring entry.
///
/// Entries share one service name; the credential key (for example
/// `vocabuloid/accessToken`) is the entry's user field. Platform calls block,
/// so they run on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

const PROBE_KEY: &str = "vocabuloid/probe";
const PROBE_VALUE: &str = "vocabuloid-keyring-check";

fn backend_error(action: &str, key: &str, e: keyring::Error) -> StoreError {
    StoreError::BackendError {
        message: format!("keyring {} {}: {}", action, key, e),
    }
}

impl KeyringStore {
    /// Fails with [`StoreError::KeyringUnavailable`] unless a throwaway entry
    /// can be written, read back and removed. Some platforms hand out entries
    /// that accept writes but never keep them; those are rejected here.
    pub fn try_new(service: &str) -> Result<Self, StoreError> {
        let unavailable = |message: String| StoreError::KeyringUnavailable { message };

        let entry = Entry::new(service, PROBE_KEY).map_err(|e| unavailable(e.to_string()))?;
        entry
            .set_password(PROBE_VALUE)
            .map_err(|e| unavailable(format!("write failed: {}", e)))?;
        let read_back = entry.get_password();
        let _ = entry.delete_credential();

        match read_back {
            Ok(value) if value == PROBE_VALUE => Ok(Self {
                service: service.to_string(),
            }),
            Ok(_) => Err(unavailable("keyring returned a different value".to_string())),
            Err(e) => Err(unavailable(format!("written entry could not be read back: {}", e))),
        }
    }

    async fn on_entry<T, F>(&self, key: &str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Entry, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let service = self.service.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key).map_err(|e| backend_error("open", &key, e))?;
            op(entry, &key)
        })
        .await
        .map_err(|e| StoreError::BackendError {
            message: format!("keyring task failed: {}", e),
        })?
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        self.on_entry(key, |entry, key| match entry.get_password() {
            Ok(value) => Ok(Some(Secret::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(backend_error("read", key, e)),
        })
        .await
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let secret = secret.clone();
        self.on_entry(key, move |entry, key| {
            entry
                .set_password(secret.expose())
                .map_err(|e| backend_error("write", key, e))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.on_entry(key, |entry, key| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(backend_error("delete", key, e)),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hosts without a usable keyring are rejected by `try_new`; anything it
    // accepts must keep what it is given.

    fn unique_key(name: &str) -> String {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("vocabuloid/{}-{}", name, nonce)
    }

    #[tokio::test]
    async fn test_accepted_keyring_keeps_request_pair() {
        let Ok(store) = KeyringStore::try_new("vocabuloid-test") else {
            return;
        };
        let key = unique_key("requestToken");

        store.set(&key, &Secret::new("hh5s93j4hdidpola")).await.unwrap();
        let read = store.get(&key).await.unwrap();
        assert_eq!(read.map(|s| s.expose().to_string()), Some("hh5s93j4hdidpola".to_string()));

        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
        store.delete(&key).await.unwrap();
    }

    #[test]
    fn test_try_new_reports_unavailable_as_typed_error() {
        match KeyringStore::try_new("vocabuloid-test") {
            Ok(_) | Err(StoreError::KeyringUnavailable { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
