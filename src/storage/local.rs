//! Filesystem-backed object store.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::{validate_key, ObjectStore, StorageError};

/// Stores each object at `{base_path}/{key}`.
pub struct LocalObjectStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    /// Create the store, making sure the root directory exists.
    pub async fn new(base_path: PathBuf, public_base_url: String) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            public_base_url,
        })
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.object_path(key);

        // Write then rename so readers never see a partial object.
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match fs::remove_file(self.object_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrite_delete() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path().to_path_buf(), "http://cdn".into())
            .await
            .unwrap();

        store
            .put("media/q1/menu.pdf", b"first".to_vec(), "application/pdf")
            .await
            .unwrap();
        store
            .put("media/q1/menu.pdf", b"second".to_vec(), "application/pdf")
            .await
            .unwrap();

        let path = temp_dir.path().join("media/q1/menu.pdf");
        assert_eq!(fs::read(&path).await.unwrap(), b"second");
        assert_eq!(store.object_url("media/q1/menu.pdf"), "http://cdn/media/q1/menu.pdf");

        store.delete("media/q1/menu.pdf").await.unwrap();
        assert!(!path.exists());
        // Deleting twice is fine.
        store.delete("media/q1/menu.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path().to_path_buf(), "http://cdn".into())
            .await
            .unwrap();

        let err = store.put("../outside", vec![1], "text/plain").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
