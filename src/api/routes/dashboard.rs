use std::collections::HashMap;

use axum::{extract::Query, Extension, Json};
use serde::{Deserialize, Serialize};

use super::{db_connection, internal_error, ApiError};
use crate::cases::{Case, CaseFilter, Cases};
use crate::roles::Role;
use crate::sessions::Session;
use crate::status;

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StageCount {
    pub stage: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total: i64,
    pub open: i64,
    pub closed: i64,
    pub by_status: Vec<StatusCount>,
    pub by_stage: Vec<StageCount>,
    /// Number of cases currently waiting on the logged-in user's role.
    pub my_queue: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

/// GET /api/dashboard/summary
pub async fn get_summary(
    Extension(session): Extension<Session>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let conn = db_connection()?;

    let total = Cases::count_all(&conn)
        .map_err(|e| internal_error("Failed to count cases", e))?;
    let counts = Cases::count_by_status(&conn)
        .map_err(|e| internal_error("Failed to count cases by status", e))?;

    let by_count: HashMap<&str, i64> = counts.iter().map(|(s, c)| (s.as_str(), *c)).collect();
    let closed = counts
        .iter()
        .filter(|(s, _)| status::is_closed(s))
        .map(|(_, c)| *c)
        .sum::<i64>();

    let mut by_stage = Vec::with_capacity(status::STAGES.len() + 1);
    for (stage, statuses) in status::STAGES.iter() {
        let count = statuses
            .iter()
            .filter_map(|s| by_count.get(s))
            .sum::<i64>();
        by_stage.push(StageCount {
            stage: stage.to_string(),
            count,
        });
    }
    // The status column is free text, so count anything unrecognized too
    let other = counts
        .iter()
        .filter(|(s, _)| status::stage_of(s).is_none())
        .map(|(_, c)| *c)
        .sum::<i64>();
    if other > 0 {
        by_stage.push(StageCount {
            stage: "Other".to_string(),
            count: other,
        });
    }

    let my_queue = queue_size_for(&conn, &session, &by_count)?;

    Ok(Json(DashboardSummary {
        total,
        open: total - closed,
        closed,
        by_status: counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        by_stage,
        my_queue,
    }))
}

/// GET /api/dashboard/recent
pub async fn get_recent(
    Extension(_session): Extension<Session>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Case>>, ApiError> {
    let conn = db_connection()?;
    let limit = params.limit.unwrap_or(10).clamp(1, 100);

    let cases = Cases::recent(&conn, limit)
        .map_err(|e| internal_error("Failed to list recent cases", e))?;
    Ok(Json(cases))
}

/// What "waiting on me" means per role. Initiators and investigators count
/// their own cases; the later roles share a queue, so a status tally is
/// enough.
fn queue_size_for(
    conn: &rusqlite::Connection,
    session: &Session,
    by_count: &HashMap<&str, i64>,
) -> Result<i64, ApiError> {
    let sum = |statuses: &[&str]| -> i64 {
        statuses.iter().filter_map(|s| by_count.get(s)).sum()
    };

    let size = match session.role {
        Role::Initiator => {
            let filter = CaseFilter {
                created_by: Some(session.username.clone()),
                status: Some(status::DRAFT.to_string()),
                ..CaseFilter::default()
            };
            Cases::list(conn, &filter)
                .map_err(|e| internal_error("Failed to list draft cases", e))?
                .len() as i64
        }
        Role::Investigator => Cases::list_allocated_in_statuses(
            conn,
            &session.username,
            &[
                status::ALLOCATED,
                status::REALLOCATED,
                status::SENT_BACK_TO_INVESTIGATOR,
                status::UNDER_INVESTIGATION,
                status::INVESTIGATION_ON_HOLD,
                status::AGENCY_RESPONSE_AWAITED,
            ],
        )
        .map_err(|e| internal_error("Failed to list allocated cases", e))?
        .len() as i64,
        Role::Reviewer => sum(&[
            status::INVESTIGATION_COMPLETED,
            status::SENT_BACK_FOR_REWORK,
            status::UNDER_REVIEW,
        ]),
        Role::Approver => sum(&[
            status::REVIEW_COMPLETED,
            status::PENDING_APPROVAL,
            status::PARTIALLY_APPROVED,
        ]),
        Role::LegalReviewer => sum(&[status::APPROVED, status::LEGAL_REVIEW]),
        Role::Actioner => sum(&[
            status::LEGAL_ACTION_INITIATED,
            status::NO_LEGAL_ACTION,
            status::ACTION_IN_PROGRESS,
        ]),
        Role::Admin => sum(&[
            status::SUBMITTED,
            status::PENDING_ALLOCATION,
            status::REOPENED,
        ]),
    };
    Ok(size)
}
