//! Case status vocabulary.
//!
//! A case's `status` column is free text. These constants are the values the
//! bundled pages write, but nothing enforces membership: `Cases::update_status`
//! persists whatever string it is handed, and each page decides for itself
//! which statuses it treats as its inbox. Keep that in mind before "fixing"
//! a handler's status list to match another page's.

// Entry
pub const DRAFT: &str = "Draft";
pub const SUBMITTED: &str = "Submitted";

// Allocation
pub const PENDING_ALLOCATION: &str = "Pending Allocation";
pub const ALLOCATED: &str = "Allocated";
pub const REALLOCATED: &str = "Reallocated";

// Investigation
pub const UNDER_INVESTIGATION: &str = "Under Investigation";
pub const INVESTIGATION_ON_HOLD: &str = "Investigation On Hold";
pub const AGENCY_RESPONSE_AWAITED: &str = "Agency Response Awaited";
pub const INVESTIGATION_COMPLETED: &str = "Investigation Completed";

// Review
pub const UNDER_REVIEW: &str = "Under Review";
pub const SENT_BACK_TO_INVESTIGATOR: &str = "Sent Back to Investigator";
pub const REVIEW_COMPLETED: &str = "Review Completed";

// Approval
pub const PENDING_APPROVAL: &str = "Pending Approval";
pub const PARTIALLY_APPROVED: &str = "Partially Approved";
pub const APPROVED: &str = "Approved";
pub const REJECTED: &str = "Rejected";
pub const SENT_BACK_FOR_REWORK: &str = "Sent Back for Rework";

// Legal
pub const LEGAL_REVIEW: &str = "Legal Review";
pub const LEGAL_ACTION_INITIATED: &str = "Legal Action Initiated";
pub const NO_LEGAL_ACTION: &str = "No Legal Action";

// Stakeholder actioning
pub const ACTION_IN_PROGRESS: &str = "Action In Progress";
pub const ACTIONS_COMPLETED: &str = "Actions Completed";

// Regulatory reporting
pub const REGULATORY_REPORT_FILED: &str = "Regulatory Report Filed";

// Closure
pub const CLOSED_FRAUD_CONFIRMED: &str = "Closed - Fraud Confirmed";
pub const CLOSED_NO_FRAUD: &str = "Closed - No Fraud";
pub const REOPENED: &str = "Reopened";

pub const ALL_STATUSES: [&str; 26] = [
    DRAFT,
    SUBMITTED,
    PENDING_ALLOCATION,
    ALLOCATED,
    REALLOCATED,
    UNDER_INVESTIGATION,
    INVESTIGATION_ON_HOLD,
    AGENCY_RESPONSE_AWAITED,
    INVESTIGATION_COMPLETED,
    UNDER_REVIEW,
    SENT_BACK_TO_INVESTIGATOR,
    REVIEW_COMPLETED,
    PENDING_APPROVAL,
    PARTIALLY_APPROVED,
    APPROVED,
    REJECTED,
    SENT_BACK_FOR_REWORK,
    LEGAL_REVIEW,
    LEGAL_ACTION_INITIATED,
    NO_LEGAL_ACTION,
    ACTION_IN_PROGRESS,
    ACTIONS_COMPLETED,
    REGULATORY_REPORT_FILED,
    CLOSED_FRAUD_CONFIRMED,
    CLOSED_NO_FRAUD,
    REOPENED,
];

/// Pipeline stages in order, with the statuses the dashboard rolls up into each.
pub const STAGES: [(&str, &[&str]); 9] = [
    ("Entry", &[DRAFT, SUBMITTED]),
    ("Allocation", &[PENDING_ALLOCATION, ALLOCATED, REALLOCATED, REOPENED]),
    (
        "Investigation",
        &[
            UNDER_INVESTIGATION,
            INVESTIGATION_ON_HOLD,
            AGENCY_RESPONSE_AWAITED,
            INVESTIGATION_COMPLETED,
            SENT_BACK_TO_INVESTIGATOR,
        ],
    ),
    ("Review", &[UNDER_REVIEW, REVIEW_COMPLETED, SENT_BACK_FOR_REWORK]),
    (
        "Approval",
        &[PENDING_APPROVAL, PARTIALLY_APPROVED, APPROVED, REJECTED],
    ),
    ("Legal", &[LEGAL_REVIEW, LEGAL_ACTION_INITIATED, NO_LEGAL_ACTION]),
    ("Actioning", &[ACTION_IN_PROGRESS, ACTIONS_COMPLETED]),
    ("Regulatory", &[REGULATORY_REPORT_FILED]),
    ("Closure", &[CLOSED_FRAUD_CONFIRMED, CLOSED_NO_FRAUD]),
];

/// Stage a status belongs to, for dashboard grouping. Unknown strings
/// (the column is free text) report as `None` and are grouped as "Other".
pub fn stage_of(status: &str) -> Option<&'static str> {
    for &(stage, statuses) in STAGES.iter() {
        if statuses.contains(&status) {
            return Some(stage);
        }
    }
    None
}

pub fn is_closed(status: &str) -> bool {
    status == CLOSED_FRAUD_CONFIRMED || status == CLOSED_NO_FRAUD
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_statuses_are_unique() {
        let unique: HashSet<&str> = ALL_STATUSES.iter().copied().collect();
        assert_eq!(unique.len(), ALL_STATUSES.len());
    }

    #[test]
    fn test_every_status_belongs_to_a_stage() {
        for status in ALL_STATUSES.iter() {
            assert!(
                stage_of(status).is_some(),
                "status '{}' is not mapped to a stage",
                status
            );
        }
    }

    #[test]
    fn test_stage_of_unknown_status() {
        assert_eq!(stage_of("Telepathically Resolved"), None);
        assert_eq!(stage_of(""), None);
    }

    #[test]
    fn test_is_closed() {
        assert!(is_closed(CLOSED_FRAUD_CONFIRMED));
        assert!(is_closed(CLOSED_NO_FRAUD));
        assert!(!is_closed(REOPENED));
        assert!(!is_closed(APPROVED));
    }
}
