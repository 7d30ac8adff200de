//! File-backed and in-memory session storage.

use crate::error::StoreError;
use crate::session::{Session, SessionKey};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

type Entries = BTreeMap<String, String>;

/// Session store persisted as a JSON object on disk.
///
/// Every mutation is written through before it returns, so a value read
/// after a reload is exactly the last value that was acknowledged.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries.
    ///
    /// A missing file is an empty session.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = if fs::try_exists(&path).await? {
            let data = fs::read(&path).await?;
            if data.is_empty() {
                Entries::new()
            } else {
                serde_json::from_slice(&data)?
            }
        } else {
            info!("Session file not found at {:?}, starting with empty session", path);
            Entries::new()
        };

        debug!("Loaded {} session entries from {:?}", entries.len(), path);

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn get(&self, key: SessionKey) -> Option<String> {
        self.entries.read().await.get(key.as_str()).cloned()
    }

    async fn snapshot(&self) -> Entries {
        self.entries.read().await.clone()
    }

    async fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries),
    {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        mutate(&mut next);
        self.flush(&next).await?;
        *entries = next;
        Ok(())
    }

    /// Write atomically using temp file + rename.
    async fn flush(&self, entries: &Entries) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &data).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Saved session ({} bytes) to {:?}", data.len(), self.path);
        Ok(())
    }
}

/// Session store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get(&self, key: SessionKey) -> Option<String> {
        self.entries.read().await.get(key.as_str()).cloned()
    }

    async fn snapshot(&self) -> Entries {
        self.entries.read().await.clone()
    }

    async fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries),
    {
        mutate(&mut *self.entries.write().await);
        Ok(())
    }
}

/// Storage backend with or without persistence.
pub enum Store {
    /// JSON file on disk, survives restarts
    File(FileStore),
    /// In-memory only (no persistence)
    Memory(MemoryStore),
}

impl Store {
    /// Open a file-backed store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Store::File(FileStore::open(path).await?))
    }

    /// Force memory store.
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    /// Whether values survive a restart.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Store::File(_))
    }

    /// Read a single value.
    pub async fn get(&self, key: SessionKey) -> Option<String> {
        match self {
            Store::File(s) => s.get(key).await,
            Store::Memory(s) => s.get(key).await,
        }
    }

    /// Write a single value.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: SessionKey, value: impl Into<String>) -> Result<(), StoreError> {
        let value = value.into();
        self.update(move |entries| {
            entries.insert(key.as_str().to_string(), value);
        })
        .await
    }

    /// Write several values in one durable update.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn set_many(&self, entries: Vec<(SessionKey, String)>) -> Result<(), StoreError> {
        self.update(move |current| {
            for (key, value) in entries {
                current.insert(key.as_str().to_string(), value);
            }
        })
        .await
    }

    /// Remove a value.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key.as_str());
        })
        .await
    }

    /// Remove every session value.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.update(|entries| entries.clear()).await
    }

    /// Typed snapshot of the current session.
    pub async fn session(&self) -> Session {
        let entries = match self {
            Store::File(s) => s.snapshot().await,
            Store::Memory(s) => s.snapshot().await,
        };
        Session::from_entries(&entries)
    }

    /// Deserialize the pending draft mirrored under `sessionData`.
    pub async fn load_draft<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        match self.get(SessionKey::SessionData).await {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Entries),
    {
        match self {
            Store::File(s) => s.update(mutate).await,
            Store::Memory(s) => s.update(mutate).await,
        }
    }
}
