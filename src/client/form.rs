use axum::body::Bytes;
use base64::Engine;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{SchoolsClient, read_create_response};
use crate::config::DEFAULT_MAX_IMAGE_BYTES;
use crate::error::DirectoryError;
use crate::types::school::{CreateSchoolResponse, FormField, SchoolForm, check_image};

/// How long the inline status line stays visible.
pub const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

pub const SUCCESS_NOTICE: &str = "School added successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Uploading,
    Saving,
    Success,
    Failed,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle | Success | Failed, Validating)
                | (Validating, Uploading | Saving | Failed)
                | (Uploading, Saving | Failed)
                | (Saving, Success | Failed)
        )
    }

    /// A create is outstanding; the submit control is disabled.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Validating | Self::Uploading | Self::Saving)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// A file accepted by the picker, with its local preview.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedImage {
    file_name: String,
    content_type: String,
    bytes: Bytes,
    preview: String,
}

impl SelectedImage {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
        max_bytes: usize,
    ) -> Result<Self, DirectoryError> {
        let content_type = content_type.into();
        let bytes = bytes.into();
        check_image(bytes.len(), &content_type, max_bytes)?;
        let preview = format!(
            "data:{};base64,{}",
            content_type,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );
        Ok(Self {
            file_name: file_name.into(),
            content_type,
            bytes,
            preview,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// `data:` URL rendered without touching the network.
    pub fn preview_url(&self) -> &str {
        &self.preview
    }
}

/// Client-side submission form: `Idle → Validating → (Uploading) → Saving → Success | Failed`.
///
/// `submit` borrows the form mutably, so one form cannot have two creates in
/// flight. Dropping a `submit` future mid-request leaves the form busy until
/// `reset`.
#[derive(Debug)]
pub struct SubmissionForm {
    fields: SchoolForm,
    image: Option<SelectedImage>,
    state: SubmissionState,
    notice: Option<Notice>,
    status: Option<(Notice, Instant)>,
    max_image_bytes: usize,
    require_location: bool,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES, true)
    }
}

impl SubmissionForm {
    pub fn new(max_image_bytes: usize, require_location: bool) -> Self {
        Self {
            fields: SchoolForm::default(),
            image: None,
            state: SubmissionState::Idle,
            notice: None,
            status: None,
            max_image_bytes,
            require_location,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn fields(&self) -> &SchoolForm {
        &self.fields
    }

    pub fn field(&self, field: FormField) -> &str {
        self.fields.get(field)
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        self.fields.set(field, value);
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.image.as_ref().map(SelectedImage::preview_url)
    }

    /// Validate and attach a file. A rejected file clears only the file selection.
    pub fn select_image(
        &mut self,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Result<(), DirectoryError> {
        match SelectedImage::new(file_name, content_type, bytes, self.max_image_bytes) {
            Ok(img) => {
                debug!(file = img.file_name(), size = img.bytes().len(), "image selected");
                self.image = Some(img);
                Ok(())
            }
            Err(e) => {
                self.image = None;
                self.post(NoticeKind::Error, e.user_message());
                Err(e)
            }
        }
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.state.is_busy()
    }

    /// Blocking notification; stays until dismissed.
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Inline status line; gone after `STATUS_MESSAGE_TTL`.
    pub fn status_message(&self) -> Option<&Notice> {
        self.status_message_at(Instant::now())
    }

    pub fn status_message_at(&self, now: Instant) -> Option<&Notice> {
        self.status
            .as_ref()
            .filter(|(_, posted)| now.saturating_duration_since(*posted) < STATUS_MESSAGE_TTL)
            .map(|(notice, _)| notice)
    }

    /// Back to a blank, idle form.
    pub fn reset(&mut self) {
        self.fields = SchoolForm::default();
        self.image = None;
        self.state = SubmissionState::Idle;
        self.notice = None;
        self.status = None;
    }

    pub async fn submit(
        &mut self,
        client: &SchoolsClient,
    ) -> Result<CreateSchoolResponse, DirectoryError> {
        if !self.can_submit() {
            return Err(DirectoryError::validation("A submission is already in progress"));
        }

        self.transition(SubmissionState::Validating);
        if let Err(e) = self.fields.validate(self.require_location) {
            return Err(self.fail(e));
        }

        if self.image.is_some() {
            self.transition(SubmissionState::Uploading);
        } else {
            self.transition(SubmissionState::Saving);
        }

        let resp = match client.send_create(&self.fields, self.image.as_ref()).await {
            Ok(resp) => resp,
            Err(e) => return Err(self.fail(e)),
        };
        if self.state == SubmissionState::Uploading {
            self.transition(SubmissionState::Saving);
        }

        match read_create_response(resp).await {
            Ok(created) => {
                self.succeed();
                info!(id = created.id, "school submitted");
                Ok(created)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn transition(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal form transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    fn succeed(&mut self) {
        self.transition(SubmissionState::Success);
        self.fields = SchoolForm::default();
        self.image = None;
        self.post(NoticeKind::Success, SUCCESS_NOTICE.to_string());
    }

    /// Enter `Failed`, keep the fields, surface the message.
    fn fail(&mut self, err: DirectoryError) -> DirectoryError {
        self.transition(SubmissionState::Failed);
        let message = err.user_message();
        warn!(error = %err, "school submission failed");
        self.post(NoticeKind::Error, message);
        err
    }

    fn post(&mut self, kind: NoticeKind, text: String) {
        let notice = Notice { kind, text };
        self.status = Some((notice.clone(), Instant::now()));
        self.notice = Some(notice);
    }
}
