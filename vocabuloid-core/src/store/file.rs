//! JSON file-backed secret storage.
//!
//! Stores every key in a single JSON object, rewritten on each mutation.
//! Default location is `credentials.json` in the platform config directory
//! (`~/.config/vocabuloid/` on Linux).

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{Secret, SecretStore, StoreError};

/// On-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileStoreData {
    /// Version of the file format.
    version: u32,

    secrets: BTreeMap<String, Secret>,
}

impl Default for FileStoreData {
    fn default() -> Self {
        Self {
            version: 1,
            secrets: BTreeMap::new(),
        }
    }
}

/// Secret store persisted as a JSON file.
///
/// The file is created lazily on the first write. On Unix it is written with
/// mode `0600`.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<FileStoreData>,
}

impl FileStore {
    /// Default storage path in the platform configuration directory.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = crate::config::project_dirs().ok_or(StoreError::ConfigDirUnavailable)?;
        Ok(dirs.config_dir().join("credentials.json"))
    }

    /// Open the store at `path`, loading existing contents if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                FileStoreData::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            FileStoreData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` to a sibling temp file (created `0600` on Unix) and
    /// rename it over the store, so readers see the old or new file whole.
    fn save(&self, data: &FileStoreData) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut staged = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut staged, data)?;
        staged.as_file_mut().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Apply `change` to a copy of the contents and keep it only once it
    /// is on disk.
    fn update(&self, change: impl FnOnce(&mut FileStoreData) -> bool) -> Result<(), StoreError> {
        let mut data = self.data.write();
        let mut next = data.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.save(&next)?;
        *data = next;
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("keys_count", &self.data.read().secrets.len())
            .finish()
    }
}

#[async_trait]
impl SecretStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.data.read().secrets.get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        self.update(|data| {
            data.secrets.insert(key.to_string(), secret.clone());
            true
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.update(|data| data.secrets.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("credentials.json");
        let store = FileStore::open(path).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let (store, _temp) = test_store();
        let path = store.path().to_path_buf();

        store
            .set("vocabuloid/accessToken", &Secret::new("token"))
            .await
            .unwrap();
        store
            .set("vocabuloid/accessSecret", &Secret::new("secret"))
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(path).unwrap();
        let token = reopened.get("vocabuloid/accessToken").await.unwrap();
        assert_eq!(token.unwrap().expose(), "token");
        assert!(reopened.exists("vocabuloid/accessSecret").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_store_delete_persists() {
        let (store, _temp) = test_store();
        let path = store.path().to_path_buf();

        store.set("k", &Secret::new("v")).await.unwrap();
        store.delete("k").await.unwrap();
        drop(store);

        let reopened = FileStore::open(path).unwrap();
        assert!(reopened.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_no_file_until_first_write() {
        let (store, _temp) = test_store();
        assert!(!store.path().exists());

        store.delete("missing").await.unwrap();
        assert!(!store.path().exists());

        store.set("k", &Secret::new("v")).await.unwrap();
        assert!(store.path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _temp) = test_store();
        store.set("k", &Secret::new("v")).await.unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_contents() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let store = FileStore::open(blocker.join("credentials.json")).unwrap();

        let result = store.set("vocabuloid/accessToken", &Secret::new("token")).await;
        assert!(result.is_err());
        assert!(store.get("vocabuloid/accessToken").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_key() {
        let (store, _temp) = test_store();
        store
            .set("vocabuloid/accessToken", &Secret::new("token"))
            .await
            .unwrap();

        // Parent directory becomes a plain file, so every write fails.
        let dir = store.path().parent().unwrap().to_path_buf();
        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, "").unwrap();

        assert!(store.delete("vocabuloid/accessToken").await.is_err());
        assert!(store.exists("vocabuloid/accessToken").await.unwrap());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (store, _temp) = test_store();
        store.set("a", &Secret::new("1")).await.unwrap();
        store.set("b", &Secret::new("2")).await.unwrap();

        let entries: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("credentials.json")]);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, "{ not json").unwrap();

        let result = FileStore::open(path);
        assert!(matches!(result, Err(StoreError::SerializationError(_))));
    }
}
