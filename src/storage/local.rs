use async_trait::async_trait;
use axum::body::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{ImageStorage, StorageError, ensure_plain_name};

/// Writes images into a directory that the server exposes under `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalImageStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalImageStorage {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        let url_prefix = url_prefix.trim_end_matches('/').to_string();
        Self { root, url_prefix }
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Read a stored image back for serving. The resolved path must stay under `root`.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        ensure_plain_name(name)?;
        let path = self.root.join(name);
        let root = fs::canonicalize(&self.root)
            .await
            .unwrap_or_else(|_| self.root.clone());
        let resolved = match fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !resolved.starts_with(&root) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(fs::read(resolved).await?)
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    fn backend_tag(&self) -> &'static str {
        "local"
    }

    async fn store(
        &self,
        name: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        ensure_plain_name(name)?;
        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.flush().await?;
        info!(path = %path.display(), size = bytes.len(), "stored image on local disk");
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        ensure_plain_name(name)?;
        let path = self.root.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "image already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
