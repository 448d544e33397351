//! Object store backends for the cache
//!
//! Keys are `/`-separated paths. Two backends are provided:
//! - `FsObjectStore`, a directory tree with one file per key
//! - `MemoryObjectStore`, for tests and dry runs

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by an object store
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl ObjectStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for object store operations
pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Key-addressed byte storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object; a missing key is `ObjectStoreError::NotFound`
    async fn read(&self, key: &str) -> ObjectStoreResult<Vec<u8>>;

    /// Writes an object, replacing any previous value
    async fn write(&self, key: &str, bytes: &[u8]) -> ObjectStoreResult<()>;

    /// Deletes objects; keys that do not exist are ignored
    async fn delete_many(&self, keys: &[String]) -> ObjectStoreResult<()>;

    /// Lists every key starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> ObjectStoreResult<Vec<String>>;
}

/// Suffix marking a part that is still being written
const TEMP_SUFFIX: &str = ".partial";

/// Object store on a local directory tree
#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to a path below the root, rejecting keys that would escape it
    fn path_for(&self, key: &str) -> ObjectStoreResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

fn io_error(key: &str, source: std::io::Error) -> ObjectStoreError {
    ObjectStoreError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn read(&self, key: &str) -> ObjectStoreResult<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> ObjectStoreResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut temp = path.clone().into_os_string();
        temp.push(format!(".{}.{}{}", std::process::id(), sequence, TEMP_SUFFIX));
        let temp = PathBuf::from(temp);

        if let Err(e) = tokio::fs::write(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(key, e));
        }
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| io_error(key, e))
    }

    async fn delete_many(&self, keys: &[String]) -> ObjectStoreResult<()> {
        for key in keys {
            let path = self.path_for(key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(key, e)),
            }
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> ObjectStoreResult<Vec<String>> {
        // Start from the deepest directory the prefix names in full.
        let start = match prefix.rfind('/') {
            Some(idx) => self.path_for(&prefix[..idx])?,
            None => self.root.clone(),
        };

        let mut keys = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(prefix, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(prefix, e))?
            {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_error(prefix, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.to_string_lossy().ends_with(TEMP_SUFFIX) {
                    continue;
                }
                if let Some(key) = self.key_for(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn read(&self, key: &str) -> ObjectStoreResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> ObjectStoreResult<()> {
        if key.is_empty() {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        self.objects
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> ObjectStoreResult<()> {
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> ObjectStoreResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
