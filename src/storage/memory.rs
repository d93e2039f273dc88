use async_trait::async_trait;
use axum::body::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ImageStorage, StorageError, ensure_plain_name};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Keeps images in memory; `set_failing(true)` makes every call fail.
#[derive(Debug, Default)]
pub struct MemoryImageStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing: AtomicBool,
}

impl MemoryImageStorage {
    pub const URL_PREFIX: &'static str = "memory://images";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, name: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(name).cloned()
    }

    /// Look an object up by the URL `store` handed out.
    pub fn get_by_url(&self, url: &str) -> Option<StoredObject> {
        let name = url.strip_prefix(Self::URL_PREFIX)?.strip_prefix('/')?;
        self.get(name)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ImageStorage for MemoryImageStorage {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn store(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.check()?;
        ensure_plain_name(name)?;
        let mut objects = self.objects.lock().map_err(|_| StorageError::Unavailable)?;
        if objects.contains_key(name) {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        objects.insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", Self::URL_PREFIX, name))
    }

    async fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.check()?;
        let mut objects = self.objects.lock().map_err(|_| StorageError::Unavailable)?;
        objects.remove(name);
        Ok(())
    }
}
