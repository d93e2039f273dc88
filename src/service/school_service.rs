use chrono::Utc;
use tracing::{error, info, warn};

use crate::db::{School, SchoolStore};
use crate::error::{ADD_SCHOOL_FAILED_MESSAGE, DirectoryError, FETCH_SCHOOLS_FAILED_MESSAGE};
use crate::storage::{SharedImageStorage, next_sequence, object_name};
use crate::types::school::{CreatedSchool, SchoolSubmission};

/// Validates submissions, stores the optional image, and reads/writes `schools`.
#[derive(Clone)]
pub struct SchoolService {
    store: SchoolStore,
    storage: SharedImageStorage,
    max_image_bytes: usize,
    require_location: bool,
}

impl SchoolService {
    pub fn new(
        store: SchoolStore,
        storage: SharedImageStorage,
        max_image_bytes: usize,
        require_location: bool,
    ) -> Self {
        Self {
            store,
            storage,
            max_image_bytes,
            require_location,
        }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    pub async fn create(&self, submission: SchoolSubmission) -> Result<CreatedSchool, DirectoryError> {
        let mut row = submission.form.validate(self.require_location)?;

        // An empty file part means nothing was selected.
        let image = submission.image.filter(|img| !img.is_empty());
        if let Some(img) = image.as_ref() {
            img.validate(self.max_image_bytes)?;
        }

        let mut stored_name = None;
        if let Some(img) = image {
            let name = object_name(
                Utc::now(),
                next_sequence(),
                &row.name,
                img.file_name.as_deref(),
                &img.content_type,
            );
            let url = self
                .storage
                .store(&name, img.bytes, &img.content_type)
                .await
                .inspect_err(|e| {
                    error!(backend = self.storage.backend_tag(), error = %e, "image upload failed");
                })?;
            row.image = Some(url);
            stored_name = Some(name);
        }

        let image_url = row.image.clone();
        let school_name = row.name.clone();
        let id = match self.store.insert(row).await {
            Ok(id) => id,
            Err(e) => {
                if let Some(name) = stored_name {
                    self.discard_orphan(&name).await;
                }
                return Err(e.during(ADD_SCHOOL_FAILED_MESSAGE));
            }
        };

        info!(id, name = %school_name, image = image_url.as_deref().unwrap_or("<none>"), "school added");
        Ok(CreatedSchool { id, image_url })
    }

    pub async fn list(&self) -> Result<Vec<School>, DirectoryError> {
        let schools = self
            .store
            .list()
            .await
            .map_err(|e| e.during(FETCH_SCHOOLS_FAILED_MESSAGE))?;
        info!(count = schools.len(), "fetched schools");
        Ok(schools)
    }

    /// Best-effort removal of an image whose row failed to insert.
    async fn discard_orphan(&self, name: &str) {
        match self.storage.remove(name).await {
            Ok(()) => info!(name, "removed image after failed insert"),
            Err(e) => warn!(name, error = %e, "failed to remove orphaned image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryImageStorage;
    use crate::types::school::{ImageUpload, SchoolForm};
    use axum::body::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const MAX: usize = 1024;

    async fn service() -> (TempDir, SchoolService, Arc<MemoryImageStorage>) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("s.db").display());
        let store = SchoolStore::connect(&url, 1, Duration::from_secs(5))
            .await
            .unwrap();
        let storage = Arc::new(MemoryImageStorage::new());
        let svc = SchoolService::new(store, storage.clone(), MAX, true);
        (dir, svc, storage)
    }

    fn submission(image: Option<ImageUpload>) -> SchoolSubmission {
        SchoolSubmission {
            form: SchoolForm {
                name: "Lincoln High".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                ..SchoolForm::default()
            },
            image,
        }
    }

    fn png(len: usize) -> ImageUpload {
        ImageUpload {
            file_name: Some("front.png".to_string()),
            content_type: "image/png".to_string(),
            bytes: Bytes::from(vec![7u8; len]),
        }
    }

    #[tokio::test]
    async fn create_without_image_stores_null() {
        let (_dir, svc, storage) = service().await;
        let created = svc.create(submission(None)).await.unwrap();
        assert_eq!(created, CreatedSchool { id: 1, image_url: None });
        assert!(storage.is_empty());
        assert_eq!(svc.list().await.unwrap()[0].image, None);
    }

    #[tokio::test]
    async fn create_with_image_stores_url_that_resolves_to_bytes() {
        let (_dir, svc, storage) = service().await;
        let created = svc.create(submission(Some(png(MAX)))).await.unwrap();
        let url = created.image_url.unwrap();
        assert!(url.ends_with("-lincoln-high.png"), "{url}");
        assert_eq!(storage.get_by_url(&url).unwrap().bytes.len(), MAX);
        assert_eq!(svc.list().await.unwrap()[0].image.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn empty_file_part_counts_as_no_image() {
        let (_dir, svc, storage) = service().await;
        let mut img = png(0);
        img.content_type = "application/octet-stream".to_string();
        let created = svc.create(submission(Some(img))).await.unwrap();
        assert_eq!(created.image_url, None);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn oversized_or_non_image_is_rejected_before_any_write() {
        let (_dir, svc, storage) = service().await;
        let err = svc.create(submission(Some(png(MAX + 1)))).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));

        let mut pdf = png(10);
        pdf.content_type = "application/pdf".to_string();
        let err = svc.create(submission(Some(pdf))).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));

        assert!(storage.is_empty());
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_inserts_nothing() {
        let (_dir, svc, storage) = service().await;
        storage.set_failing(true);
        let err = svc.create(submission(Some(png(10)))).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Storage(_)));
        assert!(svc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_image() {
        let (_dir, svc, storage) = service().await;
        sqlx::query("DROP TABLE schools")
            .execute(svc.store.pool())
            .await
            .unwrap();

        let err = svc.create(submission(Some(png(10)))).await.unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Persistence { message: ADD_SCHOOL_FAILED_MESSAGE, .. }
        ));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn simultaneous_same_name_uploads_keep_their_own_bytes() {
        let (_dir, svc, storage) = service().await;
        let mut first = png(10);
        first.bytes = Bytes::from_static(b"first-image");
        let mut second = png(10);
        second.bytes = Bytes::from_static(b"second-image");

        let (a, b) = tokio::join!(
            svc.create(submission(Some(first))),
            svc.create(submission(Some(second)))
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        let (url_a, url_b) = (a.image_url.unwrap(), b.image_url.unwrap());
        assert_ne!(url_a, url_b);
        assert_eq!(storage.get_by_url(&url_a).unwrap().bytes, Bytes::from_static(b"first-image"));
        assert_eq!(storage.get_by_url(&url_b).unwrap().bytes, Bytes::from_static(b"second-image"));
    }
}
