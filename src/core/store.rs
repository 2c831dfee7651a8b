//! Key-value persistence for the three records the app keeps between runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Credentials,
    Snapshot,
    Settings,
}

impl StoreKey {
    pub const ALL: [StoreKey; 3] = [
        StoreKey::Credentials,
        StoreKey::Snapshot,
        StoreKey::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Credentials => "credentials",
            StoreKey::Snapshot => "snapshot",
            StoreKey::Settings => "settings",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize {key} record: {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn save(&self, key: StoreKey, value: Value) -> Result<(), StoreError>;
    /// `None` when nothing is stored or the record cannot be read back.
    async fn load(&self, key: StoreKey) -> Option<Value>;
    async fn clear(&self, key: StoreKey) -> Result<(), StoreError>;
}

/// Load and decode a record. Missing and corrupt records both read as `None`.
pub async fn load_typed<T: DeserializeOwned>(store: &dyn Store, key: StoreKey) -> Option<T> {
    let value = store.load(key).await?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Ignoring corrupt {} record: {}", key.as_str(), e);
            None
        }
    }
}

pub async fn save_typed<T: Serialize + Sync>(
    store: &dyn Store,
    key: StoreKey,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
        key: key.as_str(),
        source,
    })?;
    store.save(key, json).await
}

/// Default directory for the store files: `$XDG_DATA_HOME/vibeviewer`, then
/// the platform data dir.
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join(".local")
                .join("share")
        })
        .join("vibeviewer")
}

/// One JSON file per key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    /// Where each record lives, keyed by record name.
    pub fn record_paths(&self) -> BTreeMap<&'static str, PathBuf> {
        StoreKey::ALL
            .iter()
            .map(|key| (key.as_str(), self.path(*key)))
            .collect()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl Store for FileStore {
    async fn save(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        let path = self.path(key);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;
        let json = serde_json::to_vec_pretty(&value).map_err(|source| StoreError::Serialize {
            key: key.as_str(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(io_error(&path))?;
        tracing::debug!("Saved {} to {}", key.as_str(), path.display());
        Ok(())
    }

    async fn load(&self, key: StoreKey) -> Option<Value> {
        let path = self.path(key);
        let content = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Unreadable store file {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn clear(&self, key: StoreKey) -> Result<(), StoreError> {
        let path = self.path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::settings::AppSettings;
    use crate::core::testing::MemoryStore;
    use serde_json::json;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert!(store.load(StoreKey::Credentials).await.is_none());
        store
            .save(StoreKey::Credentials, json!({ "userId": 1 }))
            .await
            .unwrap();
        assert_eq!(
            store.load(StoreKey::Credentials).await,
            Some(json!({ "userId": 1 }))
        );
        let tmp = dir.path().join("nested").join("credentials.json.tmp");
        assert!(!tmp.exists());

        store.clear(StoreKey::Credentials).await.unwrap();
        assert!(store.load(StoreKey::Credentials).await.is_none());
        store.clear(StoreKey::Credentials).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("snapshot.json"), "{not json").unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load(StoreKey::Snapshot).await.is_none());
    }

    #[tokio::test]
    async fn typed_load_falls_back_on_wrong_shape() {
        let store = MemoryStore::new();
        store
            .save(StoreKey::Settings, json!({ "analyticsDays": "lots" }))
            .await
            .unwrap();
        let settings: Option<AppSettings> = load_typed(&store, StoreKey::Settings).await;
        assert!(settings.is_none());

        save_typed(&store, StoreKey::Settings, &AppSettings::default())
            .await
            .unwrap();
        let settings: Option<AppSettings> = load_typed(&store, StoreKey::Settings).await;
        assert_eq!(settings, Some(AppSettings::default()));
    }

    #[test]
    fn keys_map_to_distinct_files() {
        let store = FileStore::new("/tmp/vv");
        let records = store.record_paths();
        let files: BTreeSet<&PathBuf> = records.values().collect();
        assert_eq!(files.len(), StoreKey::ALL.len());
        assert_eq!(
            records["snapshot"],
            Path::new("/tmp/vv").join("snapshot.json")
        );
    }
}
