use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::cases::{Case, Cases};
use crate::sessions::Session;
use crate::status;

/// Statuses a case can be closed from. Rejected and No Legal Action cases
/// close without reaching the regulatory stage.
const CLOSABLE_STATUSES: &[&str] = &[
    status::REGULATORY_REPORT_FILED,
    status::ACTIONS_COMPLETED,
    status::REJECTED,
    status::NO_LEGAL_ACTION,
];

const REOPENABLE_STATUSES: &[&str] = &[
    status::CLOSED_FRAUD_CONFIRMED,
    status::CLOSED_NO_FRAUD,
];

#[derive(Debug, Serialize)]
pub struct ClosureQueueResponse {
    pub closable: Vec<Case>,
    pub reopenable: Vec<Case>,
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    /// One of the two closed statuses.
    pub outcome: String,
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    pub note: Option<String>,
}

/// GET /api/closure/queue
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<ClosureQueueResponse>, ApiError> {
    require_role(&session, &[])?;
    let conn = db_connection()?;

    let closable = Cases::list_by_statuses(&conn, CLOSABLE_STATUSES)
        .map_err(|e| internal_error("Failed to list closable cases", e))?;
    let reopenable = Cases::list_by_statuses(&conn, REOPENABLE_STATUSES)
        .map_err(|e| internal_error("Failed to list closed cases", e))?;
    Ok(Json(ClosureQueueResponse {
        closable,
        reopenable,
    }))
}

/// POST /api/cases/{id}/close
///
/// Closes the case with a fraud-confirmed or no-fraud outcome. The closure
/// note is mandatory; it becomes part of the audit trail.
pub async fn close_case(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<CloseRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    let outcome = request.outcome.trim();
    if !REOPENABLE_STATUSES.contains(&outcome) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "Outcome must be '{}' or '{}'",
                status::CLOSED_FRAUD_CONFIRMED,
                status::CLOSED_NO_FRAUD
            ),
        ));
    }

    let note = request.note.trim();
    if note.is_empty() {
        return Err(validation_error(vec![
            "a closure note is required".to_string(),
        ]));
    }

    if !CLOSABLE_STATUSES.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case cannot be closed (status: {})", case.status),
        ));
    }

    Cases::update_status(&conn, &case_id, outcome, &session.username, Some(note))
        .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!("Case {} closed as '{}' by {}", case_id, outcome, session.username);
    load_case(&conn, &case_id).map(Json)
}

/// POST /api/cases/{id}/reopen
///
/// Reopened cases go back through allocation rather than resuming where
/// they stopped.
pub async fn reopen_case(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<ReopenRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    if !REOPENABLE_STATUSES.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Only closed cases can be reopened (status: {})", case.status),
        ));
    }

    Cases::update_status(
        &conn,
        &case_id,
        status::REOPENED,
        &session.username,
        request.note.as_deref().map(str::trim).filter(|n| !n.is_empty()),
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!("Case {} reopened by {}", case_id, session.username);
    load_case(&conn, &case_id).map(Json)
}
