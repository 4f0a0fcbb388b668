use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::cases::load_case;
use super::{api_error, db_connection, internal_error, ApiError};
use crate::allocation::Allocations;
use crate::cases::{Case, Cases};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;
use crate::users::Users;

use super::auth::require_role;

/// Cases waiting for their first allocation.
const QUEUE_STATUSES: &[&str] = &[
    status::SUBMITTED,
    status::PENDING_ALLOCATION,
    status::REOPENED,
];

/// Cases that already have an investigator but can be handed to another one.
const REALLOCATION_STATUSES: &[&str] = &[
    status::ALLOCATED,
    status::UNDER_INVESTIGATION,
    status::INVESTIGATION_ON_HOLD,
];

#[derive(Debug, Serialize)]
pub struct ReallocatableCase {
    #[serde(flatten)]
    pub case: Case,
    pub allocated_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvestigatorOption {
    pub username: String,
    pub full_name: String,
    pub active_cases: i64,
}

#[derive(Debug, Serialize)]
pub struct AllocationQueueResponse {
    pub pending: Vec<Case>,
    pub reallocatable: Vec<ReallocatableCase>,
    pub investigators: Vec<InvestigatorOption>,
}

#[derive(Debug, Deserialize)]
pub struct AllocateRequest {
    pub allocated_to: String,
    pub remarks: Option<String>,
}

/// GET /api/allocation/queue
///
/// Everything the allocation screen needs in one shot: unallocated cases,
/// cases eligible for reallocation, and the investigator workload list.
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<AllocationQueueResponse>, ApiError> {
    require_role(&session, &[])?;
    let conn = db_connection()?;

    let pending = Cases::list_by_statuses(&conn, QUEUE_STATUSES)
        .map_err(|e| internal_error("Failed to list allocation queue", e))?;

    let mut reallocatable = Vec::new();
    for case in Cases::list_by_statuses(&conn, REALLOCATION_STATUSES)
        .map_err(|e| internal_error("Failed to list reallocatable cases", e))?
    {
        let allocation = Allocations::active_for_case(&conn, &case.case_id)
            .map_err(|e| internal_error("Failed to load active allocation", e))?;
        reallocatable.push(ReallocatableCase {
            case,
            allocated_to: allocation.map(|a| a.allocated_to),
        });
    }

    let mut investigators = Vec::new();
    for user in Users::list_active_by_role(&conn, Role::Investigator)
        .map_err(|e| internal_error("Failed to list investigators", e))?
    {
        let active_cases = Allocations::active_count_for_user(&conn, &user.username)
            .map_err(|e| internal_error("Failed to count active allocations", e))?;
        investigators.push(InvestigatorOption {
            username: user.username,
            full_name: user.full_name,
            active_cases,
        });
    }

    Ok(Json(AllocationQueueResponse {
        pending,
        reallocatable,
        investigators,
    }))
}

/// POST /api/cases/{id}/allocate
pub async fn allocate_case(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<AllocateRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[])?;
    assign(&session, &case_id, &request, QUEUE_STATUSES, status::ALLOCATED).await
}

/// POST /api/cases/{id}/reallocate
pub async fn reallocate_case(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<AllocateRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[])?;
    assign(
        &session,
        &case_id,
        &request,
        REALLOCATION_STATUSES,
        status::REALLOCATED,
    )
    .await
}

/// Shared path for allocate and reallocate. Both record an allocation row
/// and move the case, they differ only in which statuses are eligible.
async fn assign(
    session: &Session,
    case_id: &str,
    request: &AllocateRequest,
    eligible: &[&str],
    new_status: &str,
) -> Result<Json<Case>, ApiError> {
    let conn = db_connection()?;
    let case = load_case(&conn, case_id)?;

    if !eligible.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case cannot be allocated (status: {})", case.status),
        ));
    }

    let target = Users::get_by_username(&conn, &request.allocated_to)
        .map_err(|e| internal_error("Failed to look up investigator", e))?;
    let valid_target = target
        .as_ref()
        .map(|u| u.active && u.role_enum() == Some(Role::Investigator))
        .unwrap_or(false);
    if !valid_target {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("'{}' is not an active investigator", request.allocated_to),
        ));
    }

    Allocations::allocate(
        &conn,
        case_id,
        &request.allocated_to,
        &session.username,
        request.remarks.as_deref(),
    )
    .map_err(|e| internal_error("Failed to record allocation", e))?;

    let note = format!("Allocated to {}", request.allocated_to);
    Cases::update_status(&conn, case_id, new_status, &session.username, Some(&note))
        .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!(
        "Case {} allocated to {} by {}",
        case_id,
        request.allocated_to,
        session.username
    );
    load_case(&conn, case_id).map(Json)
}
