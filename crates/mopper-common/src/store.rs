//! Key-value storage with per-entry expiry.
//!
//! The permission cache only needs string keys and string values, so the
//! store is deliberately untyped: callers serialize their own values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;

/// Pluggable durable key-value storage.
///
/// Entries past their `expire_at` must read as absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value for `key` if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Write `value`, replacing any previous entry.
    async fn set(&self, key: &str, value: String, expire_at: DateTime<Utc>)
    -> Result<(), StoreError>;
    /// Delete the entry for `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// A stored value and when it stops being valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Serialized value
    pub value: String,
    /// Expiry instant
    pub expire_at: DateTime<Utc>,
}

impl StoredEntry {
    fn live_value(&self, now: DateTime<Utc>) -> Option<String> {
        (self.expire_at > now).then(|| self.value.clone())
    }
}

/// In-memory store suitable for single-process use and tests.
#[derive(Clone, Default)]
pub struct MemoryKvStore(Arc<RwLock<HashMap<String, StoredEntry>>>);

impl MemoryKvStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry for `key`, including expired ones
    pub async fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.0.read().await.get(key).cloned()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        let mut map = self.0.write().await;
        match map.get(key).map(|e| e.live_value(now)) {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
    async fn set(
        &self,
        key: &str,
        value: String,
        expire_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.0
            .write()
            .await
            .insert(key.to_owned(), StoredEntry { value, expire_at });
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.0.write().await.remove(key);
        Ok(())
    }
}

/// File-backed store using a single JSON object keyed by entry key.
///
/// Each operation holds a lock shared by all clones of the handle for its
/// whole read-modify-write, and writes go to a sibling temp file that is
/// renamed over the original, so readers never see a truncated file.
///
/// NOT safe for concurrent writers across processes or across separately
/// opened handles, only suitable for development and small single-instance
/// deployments.
#[derive(Clone, Debug)]
pub struct FileKvStore {
    /// Path to the JSON file.
    pub path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileKvStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            std::fs::write(&path, b"{}")?;
        }
        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn load(&self) -> Result<HashMap<String, StoredEntry>, StoreError> {
        let file = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&file)?)
    }

    fn save(&self, map: &HashMap<String, StoredEntry>) -> Result<(), StoreError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, serde_json::to_string_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()?
            .get(key)
            .and_then(|e| e.live_value(Utc::now())))
    }
    async fn set(
        &self,
        key: &str,
        value: String,
        expire_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let now = Utc::now();
        let mut map = self.load()?;
        map.retain(|_, e| e.expire_at > now);
        map.insert(key.to_owned(), StoredEntry { value, expire_at });
        self.save(&map)
    }
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}
