//! Local key-value persistence
//!
//! One JSON document per key under a namespace directory. This is the
//! client-side store backing the guest cart, the token pair, and the
//! cached profile. Writes are synchronous so a guest mutation is durable
//! by the time the call returns.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Fixed key for the guest cart document.
pub const CART_KEY: &str = "cart";
/// Fixed key for the persisted token pair.
pub const TOKENS_KEY: &str = "tokens";
/// Fixed key for the cached user profile.
pub const USER_KEY: &str = "user";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed key-value store scoped to one namespace directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Opens (creating if needed) the namespace directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Reads and deserializes the document stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Serializes and writes `value` under `key`.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(self.path_for(key), content)?;
        tracing::debug!(key = %key, "Local store updated");
        Ok(())
    }

    /// Deletes the document under `key`. Missing documents are a no-op.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::debug!(key = %key, "Local store key cleared");
        }
        Ok(())
    }

    /// The namespace directory this store writes to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
