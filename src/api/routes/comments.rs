use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::Deserialize;

use super::cases::load_case;
use super::{api_error, db_connection, internal_error, ApiError};
use crate::comments::{CaseComment, Comments};
use crate::sessions::Session;

/// Request structure for adding a comment
#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub comment_text: String,
}

/// GET /api/cases/{id}/comments
pub async fn list_comments(
    Extension(_session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Vec<CaseComment>>, ApiError> {
    let conn = db_connection()?;
    load_case(&conn, &case_id)?;

    let comments = Comments::list_for_case(&conn, &case_id)
        .map_err(|e| internal_error("Failed to list comments", e))?;
    Ok(Json(comments))
}

/// POST /api/cases/{id}/comments
///
/// Any authenticated user may comment on any case.
pub async fn add_comment(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(req): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<CaseComment>), ApiError> {
    if req.comment_text.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Comment text is required"));
    }

    let conn = db_connection()?;
    load_case(&conn, &case_id)?;

    let comment = Comments::add(&conn, &case_id, req.comment_text.trim(), &session.username)
        .map_err(|e| internal_error("Failed to add comment", e))?;
    Ok((StatusCode::CREATED, Json(comment)))
}
