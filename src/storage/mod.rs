//! Object storage for rendered QR images and uploaded media.
//!
//! Backends implement [`ObjectStore`] and report failures as [`StorageError`].
//! Callers go through [`ObjectStoreGateway`], which never surfaces those
//! errors: it logs them and reports a plain success flag instead.

mod local;
mod s3;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

use std::sync::Arc;

use async_trait::async_trait;

/// Errors raised by object store backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store request failed: {0}")]
    Backend(String),
}

/// Key/value blob storage addressed by string keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Remove the object under `key`. Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL under which `key` is served.
    fn object_url(&self, key: &str) -> String;
}

/// Result of a gateway upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub key: String,
    pub success: bool,
}

/// Error-swallowing facade over an [`ObjectStore`].
///
/// Performs no retries; a failed call is logged once and reported as `false`.
#[derive(Clone)]
pub struct ObjectStoreGateway {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreGateway {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload a payload and report whether it landed.
    pub async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> PutOutcome {
        let size_bytes = bytes.len();
        let success = match self.store.put(key, bytes, content_type).await {
            Ok(()) => {
                tracing::debug!(key = %key, size_bytes, "Object uploaded");
                true
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Object upload failed");
                false
            }
        };

        PutOutcome {
            key: key.to_string(),
            success,
        }
    }

    /// Best-effort delete.
    pub async fn delete(&self, key: &str) -> bool {
        if key.is_empty() {
            return true;
        }
        match self.store.delete(key).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Object deleted");
                true
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Object delete failed");
                false
            }
        }
    }

    /// URL for a stored key, `None` for an empty reference.
    pub fn object_url(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            None
        } else {
            Some(self.store.object_url(key))
        }
    }
}

/// Make a user-supplied name safe to embed in an object key.
///
/// Keeps ASCII alphanumerics, `-`, `_` and `.`; everything else becomes `_`.
pub fn sanitize_key_component(component: &str) -> String {
    let cleaned: String = component
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Reject keys that could escape a storage root.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
