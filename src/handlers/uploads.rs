use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::router::DirectoryState;
use crate::storage::{StorageError, content_type_for};

/// GET <uploads-prefix>/{file} -> bytes written by the local image backend.
pub async fn serve_upload(
    State(state): State<DirectoryState>,
    Path(file): Path<String>,
) -> Response {
    let Some(uploads) = state.uploads.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match uploads.read(&file).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&file))], bytes).into_response(),
        Err(StorageError::NotFound(_) | StorageError::InvalidName(_)) => {
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            warn!(file = %file, error = %e, "failed to read upload");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
