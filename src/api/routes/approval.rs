use axum::{extract::Path, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::auth::require_role;
use super::cases::load_case;
use super::{api_error, db_connection, internal_error, ApiError};
use crate::approvals::{
    ApprovalOutcome, Approvals, CaseApproval, DECISION_APPROVED, DECISION_REJECTED,
    DECISION_SENT_BACK,
};
use crate::cases::{Case, Cases};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

const QUEUE_STATUSES: &[&str] = &[
    status::REVIEW_COMPLETED,
    status::PENDING_APPROVAL,
    status::PARTIALLY_APPROVED,
];

#[derive(Debug, Serialize)]
pub struct ApprovalQueueEntry {
    #[serde(flatten)]
    pub case: Case,
    pub approval_round: i64,
    pub approvals_in_round: Vec<CaseApproval>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub outcome: &'static str,
    pub status: String,
}

/// GET /api/approval/queue
///
/// Cases awaiting approval, each with its current round's decisions so the
/// screen can show who has already signed off.
pub async fn get_queue(
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ApprovalQueueEntry>>, ApiError> {
    require_role(&session, &[Role::Approver])?;
    let conn = db_connection()?;

    let mut entries = Vec::new();
    for case in Cases::list_by_statuses(&conn, QUEUE_STATUSES)
        .map_err(|e| internal_error("Failed to list approval queue", e))?
    {
        let (approval_round, approvals_in_round) = Approvals::round_summary(&conn, &case.case_id)
            .map_err(|e| internal_error("Failed to load approval round", e))?;
        entries.push(ApprovalQueueEntry {
            case,
            approval_round,
            approvals_in_round,
        });
    }
    Ok(Json(entries))
}

/// POST /api/cases/{id}/approval/decision
///
/// Records one approver's decision. Full approval needs two distinct
/// approvers in the same round; a rejection or send-back ends the round
/// immediately.
pub async fn record_decision(
    Extension(session): Extension<Session>,
    Path(case_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    require_role(&session, &[Role::Approver])?;
    let conn = db_connection()?;
    let case = load_case(&conn, &case_id)?;

    let decision = request.decision.trim();
    if ![DECISION_APPROVED, DECISION_REJECTED, DECISION_SENT_BACK].contains(&decision) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "Decision must be '{}', '{}' or '{}'",
                DECISION_APPROVED, DECISION_REJECTED, DECISION_SENT_BACK
            ),
        ));
    }

    if !QUEUE_STATUSES.contains(&case.status.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Case is not awaiting approval (status: {})", case.status),
        ));
    }

    let outcome = Approvals::record_decision(
        &conn,
        &case_id,
        decision,
        &session.username,
        request.remarks.as_deref(),
    )
    .map_err(|e| internal_error("Failed to record approval decision", e))?;

    let (outcome_label, new_status) = match outcome {
        ApprovalOutcome::DuplicateApprover => {
            return Err(api_error(
                StatusCode::CONFLICT,
                "You have already approved this case in the current round",
            ));
        }
        ApprovalOutcome::FirstApproval => ("First Approval", status::PARTIALLY_APPROVED),
        ApprovalOutcome::FullyApproved => ("Fully Approved", status::APPROVED),
        ApprovalOutcome::Rejected => ("Rejected", status::REJECTED),
        ApprovalOutcome::SentBack => ("Sent Back", status::SENT_BACK_FOR_REWORK),
    };

    let note = format!("Approval decision: {}", decision);
    Cases::update_status(&conn, &case_id, new_status, &session.username, Some(&note))
        .map_err(|e| internal_error("Failed to update case status", e))?;

    log::info!(
        "Approval decision '{}' on case {} by {} ({})",
        decision,
        case_id,
        session.username,
        outcome_label
    );
    Ok(Json(DecisionResponse {
        outcome: outcome_label,
        status: new_status.to_string(),
    }))
}
