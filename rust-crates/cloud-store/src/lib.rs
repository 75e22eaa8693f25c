//! Key-value storage standing in for the host's cloud store.
//!
//! Values are opaque strings; callers own the encoding.

use anyhow::{
    Context,
    Result,
    anyhow,
    ensure,
};
use std::{
    collections::HashMap,
    future::Future,
    io::ErrorKind,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
    },
};

pub trait PersistenceAdapter {
    /// `None` when nothing has been stored under `key` yet.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>>;
}

impl<T: PersistenceAdapter> PersistenceAdapter for &T {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> {
        (**self).set(key, value)
    }
}

/// One file per key under a root directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create store directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        ensure!(!key.is_empty(), "store key must not be empty");
        ensure!(
            key.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "store key '{key}' contains unsupported characters"
        );
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl PersistenceAdapter for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read store entry {}", path.display())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        // Readers never observe a half-written entry.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .with_context(|| format!("Failed to write store entry {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace store entry {}", path.display()))?;
        tracing::debug!(key, bytes = value.len(), "store entry written");
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.entries.lock() {
            guard.insert(key.into(), value.into());
        }
        store
    }

    /// Synchronous peek for assertions.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl PersistenceAdapter for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
