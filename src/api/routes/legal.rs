use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::Deserialize;

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::cases::{Case, Cases};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

const QUEUE_STATUSES: &[&str] = &[status::APPROVED, status::LEGAL_REVIEW];

#[derive(Debug, Deserialize)]
pub struct OpinionRequest {
    /// Either "initiate" or "no-action".
    pub action: String,
    pub opinion: String,
}

/// GET /api/legal/queue
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Case>>, ApiError> {
    require_role(&session, &[Role::LegalReviewer])?;
    let conn = db_connection()?;

    let cases = Cases::list_by_statuses(&conn, QUEUE_STATUSES)
        .map_err(|e| internal_error("Failed to list legal queue", e))?;
    Ok(Json(cases))
}

/// POST /api/cases/{id}/legal/take-up
pub async fn take_up(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::LegalReviewer])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    if case.status != status::APPROVED {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case is not ready for legal review (status: {})", case.status),
        ));
    }

    Cases::update_status(
        &conn,
        &case_id,
        status::LEGAL_REVIEW,
        &session.username,
        None,
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;
    load_case(&conn, &case_id).map(Json)
}

/// POST /api/cases/{id}/legal/opinion
///
/// Closes the legal stage with a written opinion, either initiating legal
/// action or waiving it.
pub async fn record_opinion(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<OpinionRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::LegalReviewer])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    let opinion = request.opinion.trim();
    if opinion.is_empty() {
        return Err(validation_error(vec![
            "a written opinion is required".to_string(),
        ]));
    }

    let new_status = match request.action.as_str() {
        "initiate" => status::LEGAL_ACTION_INITIATED,
        "no-action" => status::NO_LEGAL_ACTION,
        other => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("Unknown legal action '{}' (expected 'initiate' or 'no-action')", other),
            ));
        }
    };

    if case.status != status::LEGAL_REVIEW {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case is not in legal review (status: {})", case.status),
        ));
    }

    Cases::update_status(&conn, &case_id, new_status, &session.username, Some(opinion))
        .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!(
        "Legal opinion recorded on case {} by {} ({})",
        case_id,
        session.username,
        new_status
    );
    load_case(&conn, &case_id).map(Json)
}
