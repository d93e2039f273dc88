//! Client side of the directory: an HTTP client for `/api/schools`, the
//! submission form state machine, and the listing view.

pub mod form;
pub mod listing;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{DirectoryError, ErrorBody, FETCH_SCHOOLS_FAILED_MESSAGE, GENERIC_FAILURE_MESSAGE};
use crate::types::school::{
    CreateSchoolResponse, IMAGE_FIELD, ListSchoolsResponse, SchoolForm,
};

pub use form::{SelectedImage, SubmissionForm, SubmissionState};
pub use listing::{CardImage, ListingState, ListingView, SchoolCard};

const SCHOOLS_PATH: &str = "api/schools";

/// Thin wrapper over `reqwest` for the two directory endpoints.
#[derive(Debug, Clone)]
pub struct SchoolsClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl SchoolsClient {
    pub fn new(base_url: &Url) -> Result<Self, DirectoryError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &Url) -> Result<Self, DirectoryError> {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(SCHOOLS_PATH)?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST the six text fields plus the optional `image` part.
    pub async fn create(
        &self,
        form: &SchoolForm,
        image: Option<&SelectedImage>,
    ) -> Result<CreateSchoolResponse, DirectoryError> {
        let resp = self.send_create(form, image).await?;
        read_create_response(resp).await
    }

    pub(crate) async fn send_create(
        &self,
        form: &SchoolForm,
        image: Option<&SelectedImage>,
    ) -> Result<reqwest::Response, DirectoryError> {
        let mut body = Form::new();
        for (key, value) in form.fields() {
            body = body.text(key, value.to_string());
        }
        if let Some(img) = image {
            let part = Part::bytes(img.bytes().to_vec())
                .file_name(img.file_name().to_string())
                .mime_str(img.content_type())?;
            body = body.part(IMAGE_FIELD, part);
        }

        debug!(endpoint = %self.endpoint, with_image = image.is_some(), "submitting school");
        Ok(self
            .http
            .post(self.endpoint.clone())
            .multipart(body)
            .send()
            .await?)
    }

    pub async fn list(&self) -> Result<ListSchoolsResponse, DirectoryError> {
        let resp = self.http.get(self.endpoint.clone()).send().await?;
        let list: ListSchoolsResponse = read_json(resp).await?;
        if !list.success {
            return Err(DirectoryError::Api {
                status: reqwest::StatusCode::OK,
                message: FETCH_SCHOOLS_FAILED_MESSAGE.to_string(),
            });
        }
        Ok(list)
    }
}

pub(crate) async fn read_create_response(
    resp: reqwest::Response,
) -> Result<CreateSchoolResponse, DirectoryError> {
    let status = resp.status();
    let created: CreateSchoolResponse = read_json(resp).await?;
    if !created.success {
        return Err(DirectoryError::Api {
            status,
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        });
    }
    Ok(created)
}

/// Decode a 2xx body as `T`, anything else as the `{error}` envelope.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, DirectoryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }
    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
    Err(DirectoryError::Api { status, message })
}
