use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::TathyaError;

pub const ACTION_OPEN: &str = "Open";
pub const ACTION_COMPLETED: &str = "Completed";

#[derive(Debug, Clone, Serialize)]
pub struct StakeholderAction {
    pub action_id: i64,
    pub case_id: String,
    pub stakeholder: String,
    pub action_detail: String,
    pub status: String,
    pub created_by: String,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Post-decision action items handed to internal stakeholders (branch, HR,
/// credit, collections). Closure waits on all of a case's items completing.
pub struct StakeholderActions;

impl StakeholderActions {
    pub fn add(
        conn: &Connection,
        case_id: &str,
        stakeholder: &str,
        action_detail: &str,
        created_by: &str,
    ) -> Result<StakeholderAction, TathyaError> {
        let now = chrono::Utc::now().timestamp();
        let action_id: i64 = conn
            .query_row(
                "INSERT INTO stakeholder_actions (case_id, stakeholder, action_detail, status, created_by, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 RETURNING action_id",
                params![case_id, stakeholder, action_detail, ACTION_OPEN, created_by, now],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        Ok(StakeholderAction {
            action_id,
            case_id: case_id.to_string(),
            stakeholder: stakeholder.to_string(),
            action_detail: action_detail.to_string(),
            status: ACTION_OPEN.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
            completed_at: None,
        })
    }

    /// Marks an open item completed. Returns false for unknown or
    /// already-completed items.
    pub fn complete(conn: &Connection, action_id: i64) -> Result<bool, TathyaError> {
        let rows = conn
            .execute(
                "UPDATE stakeholder_actions SET status = ?, completed_at = ?
                 WHERE action_id = ? AND status = ?",
                params![
                    ACTION_COMPLETED,
                    chrono::Utc::now().timestamp(),
                    action_id,
                    ACTION_OPEN
                ],
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(rows > 0)
    }

    pub fn get_by_id(
        conn: &Connection,
        action_id: i64,
    ) -> Result<Option<StakeholderAction>, TathyaError> {
        let action = conn
            .query_row(
                "SELECT action_id, case_id, stakeholder, action_detail, status, created_by, created_at, completed_at
                 FROM stakeholder_actions WHERE action_id = ?",
                [action_id],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(action)
    }

    pub fn list_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<StakeholderAction>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT action_id, case_id, stakeholder, action_detail, status, created_by, created_at, completed_at
             FROM stakeholder_actions WHERE case_id = ? ORDER BY action_id",
        )?;

        let actions = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(actions)
    }

    pub fn open_count_for_case(conn: &Connection, case_id: &str) -> Result<i64, TathyaError> {
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM stakeholder_actions WHERE case_id = ? AND status = ?",
                params![case_id, ACTION_OPEN],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(count)
    }

    fn map_row(row: &Row) -> rusqlite::Result<StakeholderAction> {
        Ok(StakeholderAction {
            action_id: row.get(0)?,
            case_id: row.get(1)?,
            stakeholder: row.get(2)?,
            action_detail: row.get(3)?,
            status: row.get(4)?,
            created_by: row.get(5)?,
            created_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{Cases, NewCase};
    use crate::db::Database;
    use crate::status;

    fn setup() -> (Connection, String) {
        let conn = Database::test_connection();
        let case_id = Cases::create(&conn, &NewCase::test_fixture(), status::ACTION_IN_PROGRESS, "rhea")
            .unwrap()
            .case_id;
        (conn, case_id)
    }

    #[test]
    fn test_add_and_complete() {
        let (conn, case_id) = setup();

        let action =
            StakeholderActions::add(&conn, &case_id, "Branch", "Freeze linked accounts", "rhea").unwrap();
        assert_eq!(action.status, ACTION_OPEN);
        assert_eq!(StakeholderActions::open_count_for_case(&conn, &case_id).unwrap(), 1);

        assert!(StakeholderActions::complete(&conn, action.action_id).unwrap());
        assert_eq!(StakeholderActions::open_count_for_case(&conn, &case_id).unwrap(), 0);

        let stored = StakeholderActions::get_by_id(&conn, action.action_id).unwrap().unwrap();
        assert_eq!(stored.status, ACTION_COMPLETED);
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_complete_is_idempotent_check() {
        let (conn, case_id) = setup();
        let action = StakeholderActions::add(&conn, &case_id, "HR", "Initiate inquiry", "rhea").unwrap();

        assert!(StakeholderActions::complete(&conn, action.action_id).unwrap());
        assert!(!StakeholderActions::complete(&conn, action.action_id).unwrap());
        assert!(!StakeholderActions::complete(&conn, 9999).unwrap());
    }

    #[test]
    fn test_open_count_tracks_mixed_items() {
        let (conn, case_id) = setup();
        let first = StakeholderActions::add(&conn, &case_id, "Credit", "Flag account", "rhea").unwrap();
        StakeholderActions::add(&conn, &case_id, "Collections", "Recall notice", "rhea").unwrap();
        StakeholderActions::add(&conn, &case_id, "IT", "Disable portal access", "rhea").unwrap();

        StakeholderActions::complete(&conn, first.action_id).unwrap();
        assert_eq!(StakeholderActions::open_count_for_case(&conn, &case_id).unwrap(), 2);

        let all = StakeholderActions::list_for_case(&conn, &case_id).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].stakeholder, "Credit");
        assert_eq!(all[0].status, ACTION_COMPLETED);
    }
}
