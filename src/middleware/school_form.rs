use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
};

use crate::error::DirectoryError;
use crate::router::DirectoryState;
use crate::types::school::{
    FormField, IMAGE_FIELD, ImageUpload, SchoolSubmission, check_image,
};

/// Parses the multipart body of `POST /api/schools`.
///
/// Text parts are matched by key; unknown parts are skipped. The `image` part
/// is read chunk by chunk and rejected as soon as it passes the configured
/// ceiling, so an oversized upload is never fully buffered.
pub struct SchoolMultipart(pub SchoolSubmission);

impl FromRequest<DirectoryState> for SchoolMultipart {
    type Rejection = DirectoryError;

    async fn from_request(req: Request, state: &DirectoryState) -> Result<Self, Self::Rejection> {
        let max_bytes = state.service.max_image_bytes();
        let mut multipart = Multipart::from_request(req, state).await?;
        let mut submission = SchoolSubmission::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(key) = field.name().map(str::to_string) else {
                continue;
            };

            if key == IMAGE_FIELD {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty());
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let mut buf = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if buf.len() + chunk.len() > max_bytes {
                        check_image(buf.len() + chunk.len(), &content_type, max_bytes)?;
                    }
                    buf.extend_from_slice(&chunk);
                }

                submission.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: Bytes::from(buf),
                });
            } else if let Some(form_field) = FormField::from_key(&key) {
                let value = field.text().await?;
                submission.form.set(form_field, value);
            }
        }

        Ok(Self(submission))
    }
}
