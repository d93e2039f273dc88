use axum::{Json, extract::State};

use crate::middleware::school_form::SchoolMultipart;
use crate::types::school::{CREATED_MESSAGE, CreateSchoolResponse, ListSchoolsResponse};
use crate::{DirectoryError, router::DirectoryState};

/// POST /api/schools -> validate, store the optional image, insert one row.
pub async fn create_school(
    State(state): State<DirectoryState>,
    SchoolMultipart(submission): SchoolMultipart,
) -> Result<Json<CreateSchoolResponse>, DirectoryError> {
    let created = state.service.create(submission).await?;
    Ok(Json(CreateSchoolResponse {
        success: true,
        id: created.id,
        image_url: created.image_url,
        message: Some(CREATED_MESSAGE.to_string()),
    }))
}

/// GET /api/schools -> every row ordered by name.
pub async fn list_schools(
    State(state): State<DirectoryState>,
) -> Result<Json<ListSchoolsResponse>, DirectoryError> {
    let schools = state.service.list().await?;
    Ok(Json(ListSchoolsResponse {
        success: true,
        count: schools.len(),
        schools,
    }))
}
