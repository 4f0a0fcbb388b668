use axum::{
    body::Body,
    extract::{Multipart, Path},
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use serde::Serialize;

use super::cases::load_case;
use super::{api_error, db_connection, internal_error, ApiError};
use crate::config::Config;
use crate::documents::{CaseDocument, Documents};
use crate::sessions::Session;

/// Response structure for the document list
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<CaseDocument>,
}

/// GET /api/cases/{id}/documents
pub async fn list_documents(
    Extension(_session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let conn = db_connection()?;
    load_case(&conn, &case_id)?;

    let documents = Documents::list_for_case(&conn, &case_id)
        .map_err(|e| internal_error("Failed to list documents", e))?;
    Ok(Json(DocumentListResponse { documents }))
}

/// POST /api/cases/{id}/documents
///
/// Multipart upload. The first `file` part is stored; the overall size cap
/// comes from the body limit configured on the router.
pub async fn upload_document(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CaseDocument>), ApiError> {
    let conn = db_connection()?;
    load_case(&conn, &case_id)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Upload failed: {}", e)))?;

        if data.is_empty() {
            return Err(api_error(StatusCode::BAD_REQUEST, "Uploaded file is empty"));
        }

        let document = Documents::store(
            &conn,
            &Config::get_uploads_dir(),
            &case_id,
            &file_name,
            &content_type,
            &data,
            &session.username,
        )
        .map_err(|e| internal_error("Failed to store document", e))?;

        log::info!(
            "Document {} ({} bytes) uploaded to case {} by {}",
            document.file_name,
            document.size_bytes,
            case_id,
            session.username
        );
        return Ok((StatusCode::CREATED, Json(document)));
    }

    Err(api_error(
        StatusCode::BAD_REQUEST,
        "No file part in upload",
    ))
}

/// GET /api/documents/{id}/download
///
/// Streams the stored bytes back with the original file name.
pub async fn download_document(
    Extension(_session): Extension<Session>,
    Path(document_id): Path<i64>,
) -> Result<Response, ApiError> {
    let conn = db_connection()?;
    let document = Documents::get_by_id(&conn, document_id)
        .map_err(|e| internal_error("Failed to load document", e))?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("Document {} not found", document_id),
            )
        })?;

    let bytes = Documents::read_bytes(&Config::get_uploads_dir(), &document.stored_name)
        .map_err(|e| internal_error("Failed to read document from disk", e))?;

    // Quotes and backslashes would break the header value
    let safe_name = document.file_name.replace(['"', '\\'], "_");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &document.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", safe_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| internal_error("Failed to build download response", e))
}
