use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::cases::{Case, Cases};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

const PENDING_STATUSES: &[&str] = &[status::INVESTIGATION_COMPLETED, status::SENT_BACK_FOR_REWORK];
const IN_REVIEW_STATUSES: &[&str] = &[status::UNDER_REVIEW];

#[derive(Debug, Serialize)]
pub struct ReviewQueueResponse {
    pub pending: Vec<Case>,
    pub in_review: Vec<Case>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRemarksRequest {
    pub remarks: Option<String>,
}

/// GET /api/review/queue
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<ReviewQueueResponse>, ApiError> {
    require_role(&session, &[Role::Reviewer])?;
    let conn = db_connection()?;

    let pending = Cases::list_by_statuses(&conn, PENDING_STATUSES)
        .map_err(|e| internal_error("Failed to list review queue", e))?;
    let in_review = Cases::list_by_statuses(&conn, IN_REVIEW_STATUSES)
        .map_err(|e| internal_error("Failed to list cases in review", e))?;
    Ok(Json(ReviewQueueResponse { pending, in_review }))
}

/// POST /api/cases/{id}/review/start
pub async fn start_review(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Reviewer])?;
    move_case(
        &session,
        &case_id,
        PENDING_STATUSES,
        status::UNDER_REVIEW,
        None,
        "Review cannot start",
    )
}

/// POST /api/cases/{id}/review/send-back
///
/// Returns the case to the investigator. Remarks are mandatory so the
/// investigator knows what to rework.
pub async fn send_back(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<ReviewRemarksRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Reviewer])?;

    let remarks = request.remarks.as_deref().map(str::trim).unwrap_or("");
    if remarks.is_empty() {
        return Err(validation_error(vec![
            "remarks are required when sending a case back".to_string(),
        ]));
    }

    move_case(
        &session,
        &case_id,
        IN_REVIEW_STATUSES,
        status::SENT_BACK_TO_INVESTIGATOR,
        Some(remarks),
        "Case is not under review",
    )
}

/// POST /api/cases/{id}/review/complete
pub async fn complete_review(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<ReviewRemarksRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Reviewer])?;
    move_case(
        &session,
        &case_id,
        IN_REVIEW_STATUSES,
        status::REVIEW_COMPLETED,
        request.remarks.as_deref().map(str::trim).filter(|r| !r.is_empty()),
        "Case is not under review",
    )
}

/// POST /api/cases/{id}/review/forward
pub async fn forward_for_approval(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Reviewer])?;
    move_case(
        &session,
        &case_id,
        &[status::REVIEW_COMPLETED],
        status::PENDING_APPROVAL,
        None,
        "Review is not complete",
    )
}

fn move_case(
    session: &Session,
    case_id: &str,
    eligible: &[&str],
    new_status: &str,
    note: Option<&str>,
    gate_message: &str,
) -> Result<Json<Case>, ApiError> {
    let conn = db_connection()?;
    let case = load_case(&conn, case_id)?;

    if !eligible.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("{} (status: {})", gate_message, case.status),
        ));
    }

    Cases::update_status(&conn, case_id, new_status, &session.username, note)
        .map_err(|e| internal_error("Failed to update case status", e))?;
    load_case(&conn, case_id).map(Json)
}
