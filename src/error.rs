use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

use crate::storage::StorageError;

pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload image";
pub const PERSISTENCE_FAILED_MESSAGE: &str = "Failed to process school records. Please try again.";
pub const ADD_SCHOOL_FAILED_MESSAGE: &str = "Failed to add school. Please try again.";
pub const FETCH_SCHOOLS_FAILED_MESSAGE: &str = "Failed to fetch schools";
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

#[derive(Debug, ThisError)]
pub enum DirectoryError {
    /// User-correctable input problem; the message is shown verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Image storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// A database failure tagged with the message for the operation that hit it.
    #[error("Database error ({message}): {source}")]
    Persistence {
        message: &'static str,
        #[source]
        source: SqlxError,
    },

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Multipart rejection: {0}")]
    MultipartRejected(#[from] MultipartRejection),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Error envelope returned by the directory API to a client.
    #[error("Server responded with {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl DirectoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Attach an operation-specific user message to a database failure.
    pub fn during(self, message: &'static str) -> Self {
        match self {
            Self::Database(source) => Self::Persistence { message, source },
            other => other,
        }
    }

    /// Message suitable for showing to the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Api { message: msg, .. } => msg.clone(),
            Self::Storage(_) => UPLOAD_FAILED_MESSAGE.to_string(),
            Self::Database(_) => PERSISTENCE_FAILED_MESSAGE.to_string(),
            Self::Persistence { message, .. } => message.to_string(),
            Self::Multipart(e) => e.body_text(),
            Self::MultipartRejected(e) => e.body_text(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            DirectoryError::Validation(_) => StatusCode::BAD_REQUEST,
            DirectoryError::Multipart(e) => e.status(),
            DirectoryError::MultipartRejected(e) => e.status(),
            DirectoryError::Api { status, .. } => *status,
            DirectoryError::Storage(_)
            | DirectoryError::Database(_)
            | DirectoryError::Persistence { .. }
            | DirectoryError::Config(_)
            | DirectoryError::InvalidConfig(_)
            | DirectoryError::Io(_)
            | DirectoryError::UrlParse(_)
            | DirectoryError::Reqwest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Wire shape of every failure response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
