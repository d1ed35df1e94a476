#![forbid(unsafe_code)]

//! Byte storage for rendered certificate documents.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    /// Key is empty, absolute, or escapes the storage root.
    #[error("invalid blob key `{key}`")]
    InvalidKey { key: String },

    #[error("blob not found: {key}")]
    NotFound { key: String },

    #[error("blob storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("blob io error for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Keyed byte store. Writes overwrite; keys are `/`-separated relative paths.
pub trait BlobStorage: Send + Sync {
    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;
    fn read_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError>;
    fn exists(&self, key: &str) -> bool;
}

pub fn validate_blob_key(key: &str) -> Result<(), BlobError> {
    let invalid = || BlobError::InvalidKey {
        key: key.to_string(),
    };
    if key.trim().is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(invalid());
    }
    let path = Path::new(key);
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(invalid());
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct InMemoryBlobStorage {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BlobStorage for InMemoryBlobStorage {
    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        validate_blob_key(key)?;
        self.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        validate_blob_key(key)?;
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                key: key.to_string(),
            })
    }

    fn exists(&self, key: &str) -> bool {
        validate_blob_key(key).is_ok() && self.lock().contains_key(key)
    }
}

/// Stores each blob as a file below `root`, creating parent directories on write.
#[derive(Debug, Clone)]
pub struct FsBlobStorage {
    root: PathBuf,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_blob_key(key)?;
        Ok(self.root.join(key))
    }
}

impl BlobStorage for FsBlobStorage {
    fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        let io = |source| BlobError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        // Write then rename so readers never observe a partial document.
        let tmp = path.with_extension("partial");
        fs::write(&tmp, bytes).map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)?;
        Ok(())
    }

    fn read_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound {
                    key: key.to_string(),
                }
            } else {
                BlobError::Io {
                    key: key.to_string(),
                    source,
                }
            }
        })
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }
}
