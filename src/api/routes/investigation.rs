use axum::{extract::Path, http::StatusCode, Extension, Json};
use rusqlite::Connection;
use serde::Deserialize;

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::agency::AgencyResponses;
use crate::allocation::Allocations;
use crate::cases::{Case, Cases};
use crate::investigation::{InvestigationDetails, InvestigationUpdate, Investigations};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

/// Every status an investigator's worklist shows.
const QUEUE_STATUSES: &[&str] = &[
    status::ALLOCATED,
    status::REALLOCATED,
    status::SENT_BACK_TO_INVESTIGATOR,
    status::UNDER_INVESTIGATION,
    status::INVESTIGATION_ON_HOLD,
    status::AGENCY_RESPONSE_AWAITED,
];

/// Statuses from which a new investigation round may start.
const STARTABLE_STATUSES: &[&str] = &[
    status::ALLOCATED,
    status::REALLOCATED,
    status::SENT_BACK_TO_INVESTIGATOR,
];

#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgencyRequestRequest {
    pub agency_name: String,
    pub request_detail: String,
}

#[derive(Debug, Deserialize)]
pub struct AgencyResponseRequest {
    pub response_detail: String,
}

/// Loads the case and checks it is allocated to the caller. Admins can act
/// on any case.
fn require_case_investigator(
    conn: &Connection,
    session: &Session,
    case_id: &str,
) -> Result<Case, ApiError> {
    let case = load_case(conn, case_id)?;
    if session.role.is_admin() {
        return Ok(case);
    }

    let allocated_to = Allocations::active_for_case(conn, case_id)
        .map_err(|e| internal_error("Failed to load active allocation", e))?
        .map(|a| a.allocated_to);
    if allocated_to.as_deref() != Some(session.username.as_str()) {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            format!("Case {} is not allocated to you", case_id),
        ));
    }
    Ok(case)
}

/// GET /api/investigation/queue
///
/// Admins see every case in an investigation status; investigators see only
/// the ones allocated to them.
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Case>>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;

    let cases = if session.role.is_admin() {
        Cases::list_by_statuses(&conn, QUEUE_STATUSES)
    } else {
        Cases::list_allocated_in_statuses(&conn, &session.username, QUEUE_STATUSES)
    }
    .map_err(|e| internal_error("Failed to list investigation queue", e))?;
    Ok(Json(cases))
}

/// POST /api/cases/{id}/investigation/start
pub async fn start_investigation(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<InvestigationDetails>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;
    let case = require_case_investigator(&conn, &session, &case_id)?;

    if !STARTABLE_STATUSES.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Investigation cannot start (status: {})", case.status),
        ));
    }

    let round = Investigations::start_round(&conn, &case_id, &session.username)
        .map_err(|e| internal_error("Failed to start investigation", e))?;
    Cases::update_status(
        &conn,
        &case_id,
        status::UNDER_INVESTIGATION,
        &session.username,
        None,
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!("Investigation started on case {} by {}", case_id, session.username);
    Ok(Json(round))
}

/// POST /api/cases/{id}/investigation/hold
pub async fn hold_investigation(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<HoldRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;
    let case = require_case_investigator(&conn, &session, &case_id)?;

    if case.status != status::UNDER_INVESTIGATION {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Only an active investigation can be put on hold (status: {})", case.status),
        ));
    }

    Cases::update_status(
        &conn,
        &case_id,
        status::INVESTIGATION_ON_HOLD,
        &session.username,
        request.remarks.as_deref(),
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;
    load_case(&conn, &case_id).map(Json)
}

/// POST /api/cases/{id}/investigation/resume
pub async fn resume_investigation(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;
    let case = require_case_investigator(&conn, &session, &case_id)?;

    if case.status != status::INVESTIGATION_ON_HOLD {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Only a held investigation can resume (status: {})", case.status),
        ));
    }

    Cases::update_status(
        &conn,
        &case_id,
        status::UNDER_INVESTIGATION,
        &session.username,
        None,
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;
    load_case(&conn, &case_id).map(Json)
}

/// POST /api/cases/{id}/investigation/save
///
/// Saves work-in-progress findings without any status movement.
pub async fn save_investigation(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(update): Json<InvestigationUpdate>,
) -> Result<Json<InvestigationDetails>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;
    require_case_investigator(&conn, &session, &case_id)?;

    let round = open_round_or_400(&conn, &case_id)?;
    Investigations::save(&conn, round.investigation_id, &update)
        .map_err(|e| internal_error("Failed to save investigation details", e))?;

    let saved = Investigations::open_round(&conn, &case_id)
        .map_err(|e| internal_error("Failed to reload investigation", e))?
        .ok_or_else(|| internal_error("Investigation round vanished after save", round.investigation_id))?;
    Ok(Json(saved))
}

/// POST /api/cases/{id}/investigation/submit
///
/// Final save plus submission. Findings and the fraud determination must be
/// filled in before the round can be submitted.
pub async fn submit_investigation(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(update): Json<InvestigationUpdate>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;
    let case = require_case_investigator(&conn, &session, &case_id)?;

    if case.status != status::UNDER_INVESTIGATION {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case is not under investigation (status: {})", case.status),
        ));
    }

    let round = open_round_or_400(&conn, &case_id)?;
    Investigations::save(&conn, round.investigation_id, &update)
        .map_err(|e| internal_error("Failed to save investigation details", e))?;

    let round = Investigations::open_round(&conn, &case_id)
        .map_err(|e| internal_error("Failed to reload investigation", e))?
        .ok_or_else(|| internal_error("Investigation round vanished after save", round.investigation_id))?;

    let mut missing = Vec::new();
    if round.findings.as_deref().map(str::trim).unwrap_or("").is_empty() {
        missing.push("findings are required before submission".to_string());
    }
    if round.fraud_confirmed.as_deref().map(str::trim).unwrap_or("").is_empty() {
        missing.push("fraud determination is required before submission".to_string());
    }
    if !missing.is_empty() {
        return Err(validation_error(missing));
    }

    Investigations::submit(&conn, round.investigation_id)
        .map_err(|e| internal_error("Failed to submit investigation", e))?;
    Cases::update_status(
        &conn,
        &case_id,
        status::INVESTIGATION_COMPLETED,
        &session.username,
        None,
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!("Investigation submitted on case {} by {}", case_id, session.username);
    load_case(&conn, &case_id).map(Json)
}

/// POST /api/cases/{id}/agency-requests
pub async fn create_agency_request(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<AgencyRequestRequest>,
) -> Result<(StatusCode, Json<crate::agency::AgencyResponse>), ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;
    let case = require_case_investigator(&conn, &session, &case_id)?;

    let mut missing = Vec::new();
    if request.agency_name.trim().is_empty() {
        missing.push("agency name is required".to_string());
    }
    if request.request_detail.trim().is_empty() {
        missing.push("request detail is required".to_string());
    }
    if !missing.is_empty() {
        return Err(validation_error(missing));
    }

    if case.status != status::UNDER_INVESTIGATION {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Agency input can only be requested during investigation (status: {})", case.status),
        ));
    }

    let created = AgencyResponses::create_request(
        &conn,
        &case_id,
        request.agency_name.trim(),
        request.request_detail.trim(),
        &session.username,
    )
    .map_err(|e| internal_error("Failed to create agency request", e))?;

    let note = format!("Awaiting response from {}", created.agency_name);
    Cases::update_status(
        &conn,
        &case_id,
        status::AGENCY_RESPONSE_AWAITED,
        &session.username,
        Some(&note),
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/agency-requests/{id}/response
///
/// Records the agency's answer. The case returns to Under Investigation once
/// no requests remain open.
pub async fn record_agency_response(
    Extension(session): Extension<Session>,
    Path(response_id): Path<i64>,
    Json(request): Json<AgencyResponseRequest>,
) -> Result<Json<Case>, ApiError> {
    require_role(&session, &[Role::Investigator])?;
    let conn = db_connection()?;

    if request.response_detail.trim().is_empty() {
        return Err(validation_error(vec![
            "response detail is required".to_string(),
        ]));
    }

    let pending = AgencyResponses::get_by_id(&conn, response_id)
        .map_err(|e| internal_error("Failed to load agency request", e))?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("Agency request {} not found", response_id),
            )
        })?;

    require_case_investigator(&conn, &session, &pending.case_id)?;

    let updated = AgencyResponses::record_response(&conn, response_id, request.response_detail.trim())
        .map_err(|e| internal_error("Failed to record agency response", e))?;
    if !updated {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "This agency request has already been answered",
        ));
    }

    let still_open = AgencyResponses::open_count_for_case(&conn, &pending.case_id)
        .map_err(|e| internal_error("Failed to count open agency requests", e))?;
    if still_open == 0 {
        let note = format!("Response received from {}", pending.agency_name);
        Cases::update_status(
            &conn,
            &pending.case_id,
            status::UNDER_INVESTIGATION,
            &session.username,
            Some(&note),
        )
        .map_err(|e| internal_error("Failed to update case status", e))?;
    }

    load_case(&conn, &pending.case_id).map(Json)
}

/// Open round lookup shared by save and submit.
fn open_round_or_400(conn: &Connection, case_id: &str) -> Result<InvestigationDetails, ApiError> {
    Investigations::open_round(conn, case_id)
        .map_err(|e| internal_error("Failed to load investigation round", e))?
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("No investigation in progress for case {}", case_id),
            )
        })
}
