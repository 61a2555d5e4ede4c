//! Local key-value storage for persisted drawings.
//!
//! A store holds string values under string keys. The session writes its
//! serialized history under one fixed key after every mutation and removes
//! the key on clear.

use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key the drawing is persisted under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "savedLines";

/// Minimal key-value persistence backend.
pub trait KeyValueStore {
    /// `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;

    fn contains(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: each key is the file `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read store entry: {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create store dir: {}", self.dir.display()))?;
        fs::write(&path, value)
            .with_context(|| format!("write store entry: {}", path.display()))?;
        tracing::trace!(key, bytes = value.len(), "store entry written");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove store entry: {}", path.display())),
        }
    }
}

/// Keys become file names, so they must stay inside the store directory.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::EmptyKey);
    }
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    if let Some(ch) = key.chars().find(|c| invalid_chars.contains(c)) {
        tracing::error!(key, invalid_char = %ch, "storage key contains invalid character");
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            ch,
        });
    }
    if key == "." || key == ".." {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
            ch: '.',
        });
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage key cannot be empty")]
    EmptyKey,

    #[error("storage key '{key}' contains invalid character '{ch}'")]
    InvalidKey { key: String, ch: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_get_set_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "[]").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("[]"));
        assert!(store.contains("k").unwrap());

        store.remove("k").unwrap();
        assert!(!store.contains("k").unwrap());
        // Removing again is fine
        store.remove("k").unwrap();
    }

    #[test]
    fn test_file_store_creates_dir_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("store");
        let mut store = FileStore::new(&dir);

        assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), None);
        assert!(!dir.exists());

        store.set(DEFAULT_STORAGE_KEY, "[1]").unwrap();
        assert!(dir.join("savedLines.json").exists());
        assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap().as_deref(), Some("[1]"));

        store.remove(DEFAULT_STORAGE_KEY).unwrap();
        assert_eq!(store.get(DEFAULT_STORAGE_KEY).unwrap(), None);
        store.remove(DEFAULT_STORAGE_KEY).unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(tmp.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.set("", "x").is_err());
        assert!(store.get("a/b").is_err());
    }
}
