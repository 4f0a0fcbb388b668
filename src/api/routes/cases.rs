use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::auth::require_role;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::allocation::{Allocations, CaseAllocation};
use crate::approvals::{Approvals, CaseApproval};
use crate::audit::{Audit, AuditEntry};
use crate::cases::{Case, CaseFilter, Cases, NewCase};
use crate::comments::{CaseComment, Comments};
use crate::documents::{CaseDocument, Documents};
use crate::investigation::{InvestigationDetails, Investigations};
use crate::regulatory::{RegulatoryReport, RegulatoryReports};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;
use crate::actions::{StakeholderAction, StakeholderActions};
use crate::agency::{AgencyResponse, AgencyResponses};

/// Request structure for creating a case. `submit` chooses between saving a
/// draft and submitting straight into the allocation queue.
#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    #[serde(flatten)]
    pub case: NewCase,
    #[serde(default)]
    pub submit: bool,
}

/// Response structure for the case list
#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub cases: Vec<Case>,
}

/// Full case detail: the case row plus every satellite the detail tabs show.
#[derive(Debug, Serialize)]
pub struct CaseDetailResponse {
    pub case: Case,
    pub active_allocation: Option<CaseAllocation>,
    pub allocation_history: Vec<CaseAllocation>,
    pub investigations: Vec<InvestigationDetails>,
    pub agency_responses: Vec<AgencyResponse>,
    pub approvals: Vec<CaseApproval>,
    pub actions: Vec<StakeholderAction>,
    pub regulatory_reports: Vec<RegulatoryReport>,
    pub documents: Vec<CaseDocument>,
    pub comments: Vec<CaseComment>,
}

/// Loads a case or produces the standard 404. Shared by most case routes.
pub(super) fn load_case(conn: &rusqlite::Connection, case_id: &str) -> Result<Case, ApiError> {
    Cases::get_by_id(conn, case_id)
        .map_err(|e| internal_error("Failed to load case", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Case {} not found", case_id)))
}

/// POST /api/cases
///
/// Creates a case as `Draft` (save) or `Submitted` (submit).
pub async fn create_case(
    Extension(session): Extension<Session>,
    Json(req): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    require_role(&session, &[Role::Initiator])?;
    req.case.validate().map_err(validation_error)?;

    let initial_status = if req.submit {
        status::SUBMITTED
    } else {
        status::DRAFT
    };

    let conn = db_connection()?;
    let case = Cases::create(&conn, &req.case, initial_status, &session.username)
        .map_err(|e| internal_error("Failed to create case", e))?;

    log::info!(
        "Case {} created as {} by {}",
        case.case_id,
        case.status,
        session.username
    );
    Ok((StatusCode::CREATED, Json(case)))
}

/// GET /api/cases
///
/// Filtered, paginated case list.
pub async fn list_cases(
    Extension(_session): Extension<Session>,
    Query(filter): Query<CaseFilter>,
) -> Result<Json<CaseListResponse>, ApiError> {
    let conn = db_connection()?;
    let cases =
        Cases::list(&conn, &filter).map_err(|e| internal_error("Failed to list cases", e))?;
    Ok(Json(CaseListResponse { cases }))
}

/// GET /api/cases/{id}
///
/// The case with all satellite rows for the detail tabs.
pub async fn get_case(
    Extension(_session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<CaseDetailResponse>, ApiError> {
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    let detail = CaseDetailResponse {
        active_allocation: Allocations::active_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load allocation", e))?,
        allocation_history: Allocations::history_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load allocation history", e))?,
        investigations: Investigations::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load investigations", e))?,
        agency_responses: AgencyResponses::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load agency responses", e))?,
        approvals: Approvals::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load approvals", e))?,
        actions: StakeholderActions::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load actions", e))?,
        regulatory_reports: RegulatoryReports::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load regulatory reports", e))?,
        documents: Documents::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load documents", e))?,
        comments: Comments::list_for_case(&conn, &case_id)
            .map_err(|e| internal_error("Failed to load comments", e))?,
        case,
    };

    Ok(Json(detail))
}

/// PUT /api/cases/{id}
///
/// Edits a draft's form fields. Only drafts are editable; everything after
/// submission changes through the stage handlers.
pub async fn update_case(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(req): Json<NewCase>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Initiator])?;
    req.validate().map_err(validation_error)?;

    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;
    if case.status != status::DRAFT {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Only draft cases can be edited (status: {})", case.status),
        ));
    }

    Cases::update_details(&conn, &case_id, &req, &session.username)
        .map_err(|e| internal_error("Failed to update case", e))?;

    let case = load_case(&conn, &case_id)?;
    Ok(Json(case))
}

/// POST /api/cases/{id}/submit
///
/// Moves a draft into the allocation queue.
pub async fn submit_case(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Initiator])?;

    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;
    if case.status != status::DRAFT {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Only draft cases can be submitted (status: {})", case.status),
        ));
    }

    Cases::update_status(&conn, &case_id, status::SUBMITTED, &session.username, None)
        .map_err(|e| internal_error("Failed to submit case", e))?;

    let case = load_case(&conn, &case_id)?;
    Ok(Json(case))
}

/// GET /api/cases/{id}/history
///
/// The case's audit trail, oldest first.
pub async fn get_history(
    Extension(_session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let conn = db_connection()?;
    load_case(&conn, &case_id)?;

    let entries = Audit::list_for_case(&conn, &case_id)
        .map_err(|e| internal_error("Failed to load history", e))?;
    Ok(Json(entries))
}
