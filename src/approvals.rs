use std::collections::HashSet;

use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::db::Database;
use crate::error::TathyaError;

pub const DECISION_APPROVED: &str = "Approved";
pub const DECISION_REJECTED: &str = "Rejected";
pub const DECISION_SENT_BACK: &str = "Sent Back";

/// Distinct approvers needed before a case counts as fully approved.
pub const REQUIRED_APPROVALS: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct CaseApproval {
    pub approval_id: i64,
    pub case_id: String,
    pub approval_round: i64,
    pub decision: String,
    pub decided_by: String,
    pub decided_at: i64,
    pub remarks: Option<String>,
}

/// What a recorded decision did to the current approval round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Approved, but more approvers are still needed.
    FirstApproval,
    /// This approval reached the required count.
    FullyApproved,
    Rejected,
    SentBack,
    /// The caller already decided in this round; nothing was recorded.
    DuplicateApprover,
}

/// Dual-approval bookkeeping. A round is one pass through the approval stage:
/// it closes on a rejection, a send-back, or the required number of distinct
/// approvals, and the next decision opens a fresh round.
pub struct Approvals;

impl Approvals {
    /// Records a decision in the case's current round, inside an immediate
    /// transaction so two approvers submitting together cannot both be counted
    /// as the completing approval. `decision` must be one of the DECISION_*
    /// constants; the table's CHECK constraint rejects anything else.
    pub fn record_decision(
        conn: &Connection,
        case_id: &str,
        decision: &str,
        decided_by: &str,
        remarks: Option<&str>,
    ) -> Result<ApprovalOutcome, TathyaError> {
        Database::immediate_transaction(conn, |c| {
            let round = Self::current_round(c, case_id)?;
            let existing = Self::decisions_in_round(c, case_id, round)?;

            if existing.iter().any(|a| a.decided_by == decided_by) {
                return Ok(ApprovalOutcome::DuplicateApprover);
            }

            c.execute(
                "INSERT INTO case_approvals (case_id, approval_round, decision, decided_by, decided_at, remarks)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    case_id,
                    round,
                    decision,
                    decided_by,
                    chrono::Utc::now().timestamp(),
                    remarks
                ],
            )
            .map_err(TathyaError::DatabaseError)?;

            let outcome = match decision {
                DECISION_REJECTED => ApprovalOutcome::Rejected,
                DECISION_SENT_BACK => ApprovalOutcome::SentBack,
                _ => {
                    let mut approvers: HashSet<&str> = existing
                        .iter()
                        .filter(|a| a.decision == DECISION_APPROVED)
                        .map(|a| a.decided_by.as_str())
                        .collect();
                    approvers.insert(decided_by);

                    if approvers.len() >= REQUIRED_APPROVALS {
                        ApprovalOutcome::FullyApproved
                    } else {
                        ApprovalOutcome::FirstApproval
                    }
                }
            };
            Ok(outcome)
        })
    }

    /// The round the next decision will land in: the latest round if it is
    /// still open, otherwise a fresh one.
    pub fn current_round(conn: &Connection, case_id: &str) -> Result<i64, TathyaError> {
        let latest: Option<i64> = conn
            .query_row(
                "SELECT MAX(approval_round) FROM case_approvals WHERE case_id = ?",
                [case_id],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        let latest = match latest {
            Some(round) => round,
            None => return Ok(1),
        };

        let decisions = Self::decisions_in_round(conn, case_id, latest)?;
        if Self::round_is_closed(&decisions) {
            Ok(latest + 1)
        } else {
            Ok(latest)
        }
    }

    /// A round closes on any rejection or send-back, or once the required
    /// number of distinct approvers have approved.
    pub fn round_is_closed(decisions: &[CaseApproval]) -> bool {
        if decisions
            .iter()
            .any(|a| a.decision == DECISION_REJECTED || a.decision == DECISION_SENT_BACK)
        {
            return true;
        }

        let approvers: HashSet<&str> = decisions
            .iter()
            .filter(|a| a.decision == DECISION_APPROVED)
            .map(|a| a.decided_by.as_str())
            .collect();
        approvers.len() >= REQUIRED_APPROVALS
    }

    /// Decisions in the current round, for the approval page's progress panel.
    pub fn round_summary(
        conn: &Connection,
        case_id: &str,
    ) -> Result<(i64, Vec<CaseApproval>), TathyaError> {
        let round = Self::current_round(conn, case_id)?;
        let decisions = Self::decisions_in_round(conn, case_id, round)?;
        Ok((round, decisions))
    }

    pub fn list_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<CaseApproval>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT approval_id, case_id, approval_round, decision, decided_by, decided_at, remarks
             FROM case_approvals WHERE case_id = ? ORDER BY approval_id",
        )?;

        let approvals = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(approvals)
    }

    fn decisions_in_round(
        conn: &Connection,
        case_id: &str,
        round: i64,
    ) -> Result<Vec<CaseApproval>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT approval_id, case_id, approval_round, decision, decided_by, decided_at, remarks
             FROM case_approvals WHERE case_id = ? AND approval_round = ? ORDER BY approval_id",
        )?;

        let approvals = stmt
            .query_map(params![case_id, round], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(approvals)
    }

    fn map_row(row: &Row) -> rusqlite::Result<CaseApproval> {
        Ok(CaseApproval {
            approval_id: row.get(0)?,
            case_id: row.get(1)?,
            approval_round: row.get(2)?,
            decision: row.get(3)?,
            decided_by: row.get(4)?,
            decided_at: row.get(5)?,
            remarks: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{Cases, NewCase};
    use crate::status;

    fn setup() -> (Connection, String) {
        let conn = Database::test_connection();
        let case_id = Cases::create(&conn, &NewCase::test_fixture(), status::PENDING_APPROVAL, "diya")
            .unwrap()
            .case_id;
        (conn, case_id)
    }

    #[test]
    fn test_first_approval_is_partial() {
        let (conn, case_id) = setup();

        let outcome =
            Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "asha", Some("Looks right")).unwrap();
        assert_eq!(outcome, ApprovalOutcome::FirstApproval);

        let (round, decisions) = Approvals::round_summary(&conn, &case_id).unwrap();
        assert_eq!(round, 1);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].decided_by, "asha");
    }

    #[test]
    fn test_second_distinct_approver_completes() {
        let (conn, case_id) = setup();

        Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "asha", None).unwrap();
        let outcome = Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "bala", None).unwrap();
        assert_eq!(outcome, ApprovalOutcome::FullyApproved);

        // The completed round is closed; the next decision starts round 2
        assert_eq!(Approvals::current_round(&conn, &case_id).unwrap(), 2);
    }

    #[test]
    fn test_same_approver_cannot_approve_twice() {
        let (conn, case_id) = setup();

        Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "asha", None).unwrap();
        let outcome = Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "asha", None).unwrap();
        assert_eq!(outcome, ApprovalOutcome::DuplicateApprover);

        // Nothing was recorded for the duplicate
        assert_eq!(Approvals::list_for_case(&conn, &case_id).unwrap().len(), 1);
    }

    #[test]
    fn test_rejection_closes_round() {
        let (conn, case_id) = setup();

        Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "asha", None).unwrap();
        let outcome =
            Approvals::record_decision(&conn, &case_id, DECISION_REJECTED, "bala", Some("Evidence thin")).unwrap();
        assert_eq!(outcome, ApprovalOutcome::Rejected);

        // asha may decide again in the new round
        let outcome = Approvals::record_decision(&conn, &case_id, DECISION_APPROVED, "asha", None).unwrap();
        assert_eq!(outcome, ApprovalOutcome::FirstApproval);

        let (round, decisions) = Approvals::round_summary(&conn, &case_id).unwrap();
        assert_eq!(round, 2);
        assert_eq!(decisions.len(), 1);
        assert_eq!(Approvals::list_for_case(&conn, &case_id).unwrap().len(), 3);
    }

    #[test]
    fn test_send_back_closes_round() {
        let (conn, case_id) = setup();

        let outcome =
            Approvals::record_decision(&conn, &case_id, DECISION_SENT_BACK, "asha", Some("Re-verify visit")).unwrap();
        assert_eq!(outcome, ApprovalOutcome::SentBack);
        assert_eq!(Approvals::current_round(&conn, &case_id).unwrap(), 2);
    }

    #[test]
    fn test_round_is_closed_rules() {
        let approval = |decision: &str, decided_by: &str| CaseApproval {
            approval_id: 0,
            case_id: "CASE-202608-00001".to_string(),
            approval_round: 1,
            decision: decision.to_string(),
            decided_by: decided_by.to_string(),
            decided_at: 0,
            remarks: None,
        };

        assert!(!Approvals::round_is_closed(&[]));
        assert!(!Approvals::round_is_closed(&[approval(DECISION_APPROVED, "asha")]));
        assert!(Approvals::round_is_closed(&[
            approval(DECISION_APPROVED, "asha"),
            approval(DECISION_APPROVED, "bala"),
        ]));
        assert!(Approvals::round_is_closed(&[approval(DECISION_REJECTED, "asha")]));
        assert!(Approvals::round_is_closed(&[approval(DECISION_SENT_BACK, "asha")]));
    }
}
