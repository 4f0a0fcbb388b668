use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, validation_error, ApiError};
use crate::cases::{Case, Cases};
use crate::regulatory::{RegulatoryReport, RegulatoryReports, REPORT_TYPES};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

const QUEUE_STATUSES: &[&str] = &[status::ACTIONS_COMPLETED, status::REGULATORY_REPORT_FILED];

#[derive(Debug, Serialize)]
pub struct RegulatoryQueueEntry {
    #[serde(flatten)]
    pub case: Case,
    pub reports_filed: i64,
}

#[derive(Debug, Serialize)]
pub struct RegulatoryQueueResponse {
    pub cases: Vec<RegulatoryQueueEntry>,
    pub report_types: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct FileReportRequest {
    pub report_type: String,
    pub reference_number: Option<String>,
    pub report_date: String,
    pub remarks: Option<String>,
}

/// GET /api/regulatory/queue
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<RegulatoryQueueResponse>, ApiError> {
    require_role(&session, &[Role::Actioner])?;
    let conn = db_connection()?;

    let mut cases = Vec::new();
    for case in Cases::list_by_statuses(&conn, QUEUE_STATUSES)
        .map_err(|e| internal_error("Failed to list regulatory queue", e))?
    {
        let reports_filed = RegulatoryReports::count_for_case(&conn, &case.case_id)
            .map_err(|e| internal_error("Failed to count reports", e))?;
        cases.push(RegulatoryQueueEntry {
            case,
            reports_filed,
        });
    }

    Ok(Json(RegulatoryQueueResponse {
        cases,
        report_types: REPORT_TYPES.to_vec(),
    }))
}

/// POST /api/cases/{id}/regulatory-reports
///
/// Files a regulatory report against the case. The type list in the UI
/// comes from the queue response but free text is accepted, covering
/// report formats the list does not anticipate.
pub async fn file_report(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<FileReportRequest>,
) -> Result<(StatusCode, Json<RegulatoryReport>), ApiError> {
    require_role(&session, &[Role::Actioner])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    let mut missing = Vec::new();
    if request.report_type.trim().is_empty() {
        missing.push("report type is required".to_string());
    }
    if request.report_date.trim().is_empty() {
        missing.push("report date is required".to_string());
    }
    if !missing.is_empty() {
        return Err(validation_error(missing));
    }

    if !QUEUE_STATUSES.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case is not ready for regulatory reporting (status: {})", case.status),
        ));
    }

    let report = RegulatoryReports::file_report(
        &conn,
        &case_id,
        request.report_type.trim(),
        request.reference_number.as_deref().map(str::trim).filter(|r| !r.is_empty()),
        request.report_date.trim(),
        request.remarks.as_deref(),
        &session.username,
    )
    .map_err(|e| internal_error("Failed to file regulatory report", e))?;

    let note = format!("{} filed", report.report_type);
    Cases::update_status(
        &conn,
        &case_id,
        status::REGULATORY_REPORT_FILED,
        &session.username,
        Some(&note),
    )
    .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!(
        "Regulatory report {} filed on case {} by {}",
        report.report_type,
        case_id,
        session.username
    );
    Ok((StatusCode::CREATED, Json(report)))
}
