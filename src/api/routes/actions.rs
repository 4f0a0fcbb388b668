use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::actions::{StakeholderAction, StakeholderActions};
use crate::cases::{Case, Cases};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

const QUEUE_STATUSES: &[&str] = &[
    status::LEGAL_ACTION_INITIATED,
    status::NO_LEGAL_ACTION,
    status::ACTION_IN_PROGRESS,
];

#[derive(Debug, Serialize)]
pub struct ActionQueueEntry {
    #[serde(flatten)]
    pub case: Case,
    pub open_items: i64,
    pub total_items: usize,
}

#[derive(Debug, Deserialize)]
pub struct AddActionRequest {
    pub stakeholder: String,
    pub action_detail: String,
}

/// GET /api/actions/queue
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ActionQueueEntry>>, ApiError> {
    require_role(&session, &[Role::Actioner])?;
    let conn = db_connection()?;

    let mut entries = Vec::new();
    for case in Cases::list_by_statuses(&conn, QUEUE_STATUSES)
        .map_err(|e| internal_error("Failed to list actioning queue", e))?
    {
        let open_items = StakeholderActions::open_count_for_case(&conn, &case.case_id)
            .map_err(|e| internal_error("Failed to count open actions", e))?;
        let total_items = StakeholderActions::list_for_case(&conn, &case.case_id)
            .map_err(|e| internal_error("Failed to list actions", e))?
            .len();
        entries.push(ActionQueueEntry {
            case,
            open_items,
            total_items,
        });
    }
    Ok(Json(entries))
}

/// POST /api/cases/{id}/actions
///
/// Adds a stakeholder action item. The first item moves the case into
/// Action In Progress.
pub async fn add_action(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<AddActionRequest>,
) -> Result<(StatusCode, Json<StakeholderAction>), ApiError> {
    require_role(&session, &[Role::Actioner])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    let mut missing = Vec::new();
    if request.stakeholder.trim().is_empty() {
        missing.push("stakeholder is required".to_string());
    }
    if request.action_detail.trim().is_empty() {
        missing.push("action detail is required".to_string());
    }
    if !missing.is_empty() {
        return Err(validation_error(missing));
    }

    if !QUEUE_STATUSES.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case is not in the actioning stage (status: {})", case.status),
        ));
    }

    let action = StakeholderActions::add(
        &conn,
        &case_id,
        request.stakeholder.trim(),
        request.action_detail.trim(),
        &session.username,
    )
    .map_err(|e| internal_error("Failed to add action item", e))?;

    if case.status != status::ACTION_IN_PROGRESS {
        Cases::update_status(
            &conn,
            &case_id,
            status::ACTION_IN_PROGRESS,
            &session.username,
            None,
        )
        .map_err(|e| internal_error("Failed to update case status", e))?;
    }

    Ok((StatusCode::CREATED, Json(action)))
}

/// POST /api/actions/{id}/complete
pub async fn complete_action(
    Extension(session): Extension<Session>,
    Path(action_id): Path<i64>,
) -> Result<Json<StakeholderAction>, ApiError> {
    require_role(&session, &[Role::Actioner])?;
    let conn = db_connection()?;

    let action = StakeholderActions::get_by_id(&conn, action_id)
        .map_err(|e| internal_error("Failed to load action item", e))?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("Action item {} not found", action_id),
            )
        })?;

    let updated = StakeholderActions::complete(&conn, action_id)
        .map_err(|e| internal_error("Failed to complete action item", e))?;
    if !updated {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "This action item is already completed",
        ));
    }

    let completed = StakeholderActions::get_by_id(&conn, action_id)
        .map_err(|e| internal_error("Failed to reload action item", e))?
        .unwrap_or(action);
    Ok(Json(completed))
}

/// POST /api/cases/{id}/actions/complete-all
///
/// Marks the actioning stage done. Refused while any item is still open.
pub async fn complete_stage(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Actioner])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    if case.status != status::ACTION_IN_PROGRESS {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case has no actioning in progress (status: {})", case.status),
        ));
    }

    let open = StakeholderActions::open_count_for_case(&conn, &case_id)
        .map_err(|e| internal_error("Failed to count open actions", e))?;
    if open > 0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("{} action item(s) are still open", open),
        ));
    }

    Cases::update_status(
        &conn,
        &case_id,
        status::ACTIONS_COMPLETED,
        &session.username,
        None,
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;
    load_case(&conn, &case_id).map(Json)
}
