//! Image storage backends.
//!
//! Layout:
//! - `local.rs`: files written under a directory served by this process
//! - `remote.rs`: objects pushed to an HTTP blob store
//! - `memory.rs`: in-process map used by tests

pub mod local;
pub mod memory;
pub mod remote;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error as ThisError;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::DirectoryError;

pub use local::LocalImageStorage;
pub use memory::MemoryImageStorage;
pub use remote::RemoteImageStorage;

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("blob store responded with status {0}")]
    UpstreamStatus(StatusCode),

    #[error("invalid object name: {0}")]
    InvalidName(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("blob store token is not a valid header value")]
    InvalidToken,

    #[error("storage backend unavailable")]
    Unavailable,
}

/// Somewhere to put uploaded images and get back a URL the listing can render.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Persist `bytes` under `name` and return a publicly retrievable URL or path.
    async fn store(&self, name: &str, bytes: Bytes, content_type: &str)
    -> Result<String, StorageError>;

    async fn remove(&self, name: &str) -> Result<(), StorageError>;
}

pub type SharedImageStorage = Arc<dyn ImageStorage>;

/// Build the backend selected by configuration.
pub fn from_config(cfg: &StorageConfig) -> Result<SharedImageStorage, DirectoryError> {
    match cfg.backend {
        StorageBackend::Local => Ok(Arc::new(LocalImageStorage::new(
            cfg.local.dir.clone(),
            cfg.local.url_prefix.clone(),
        ))),
        StorageBackend::Remote => {
            let endpoint = cfg.remote.endpoint.clone().ok_or_else(|| {
                DirectoryError::InvalidConfig("storage.remote.endpoint is not set".to_string())
            })?;
            let token = cfg.remote.token.clone().ok_or_else(|| {
                DirectoryError::InvalidConfig("storage.remote.token is not set".to_string())
            })?;
            Ok(Arc::new(RemoteImageStorage::new(
                endpoint,
                token,
                cfg.remote.public_base_url.clone(),
                cfg.remote.key_prefix.clone(),
            )?))
        }
    }
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Process-wide counter that keeps names minted in the same millisecond apart.
pub fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// `<timestamp-ms>-<seq>-<sanitized-name>.<ext>`
pub fn object_name(
    at: DateTime<Utc>,
    seq: u64,
    school_name: &str,
    file_name: Option<&str>,
    content_type: &str,
) -> String {
    let ext = file_name
        .and_then(extension_of)
        .unwrap_or_else(|| extension_for_content_type(content_type).to_string());
    let slug = sanitize_name(school_name);
    let slug = if slug.is_empty() { "school".to_string() } else { slug };
    format!("{}-{}-{}.{}", at.timestamp_millis(), seq, slug, ext)
}

/// Lowercase, collapse whitespace runs to `-`, keep only `[a-z0-9_-]`.
pub fn sanitize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        _ => "img",
    }
}

/// Inverse of the table above, used when serving local files.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Reject anything that could escape the storage namespace.
pub(crate) fn ensure_plain_name(name: &str) -> Result<(), StorageError> {
    let plain = !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');
    if plain {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
