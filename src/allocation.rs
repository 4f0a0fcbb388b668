use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::db::Database;
use crate::error::TathyaError;

#[derive(Debug, Clone, Serialize)]
pub struct CaseAllocation {
    pub allocation_id: i64,
    pub case_id: String,
    pub allocated_to: String,
    pub allocated_by: String,
    pub allocated_at: i64,
    pub remarks: Option<String>,
    pub is_active: bool,
}

/// Allocation history for cases. At most one row per case is active; the
/// active row names the investigator currently holding the case.
pub struct Allocations;

impl Allocations {
    /// Assigns (or reassigns) a case. Any previous active allocation is
    /// deactivated and a new active row inserted, in one transaction.
    pub fn allocate(
        conn: &Connection,
        case_id: &str,
        allocated_to: &str,
        allocated_by: &str,
        remarks: Option<&str>,
    ) -> Result<CaseAllocation, TathyaError> {
        Database::immediate_transaction(conn, |c| {
            c.execute(
                "UPDATE case_allocations SET is_active = 0 WHERE case_id = ? AND is_active = 1",
                [case_id],
            )
            .map_err(TathyaError::DatabaseError)?;

            let now = chrono::Utc::now().timestamp();
            let allocation_id: i64 = c
                .query_row(
                    "INSERT INTO case_allocations (case_id, allocated_to, allocated_by, allocated_at, remarks, is_active)
                     VALUES (?, ?, ?, ?, ?, 1)
                     RETURNING allocation_id",
                    params![case_id, allocated_to, allocated_by, now, remarks],
                    |row| row.get(0),
                )
                .map_err(TathyaError::DatabaseError)?;

            Ok(CaseAllocation {
                allocation_id,
                case_id: case_id.to_string(),
                allocated_to: allocated_to.to_string(),
                allocated_by: allocated_by.to_string(),
                allocated_at: now,
                remarks: remarks.map(str::to_string),
                is_active: true,
            })
        })
    }

    /// The active allocation for a case, if any.
    pub fn active_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Option<CaseAllocation>, TathyaError> {
        let allocation = conn
            .query_row(
                "SELECT allocation_id, case_id, allocated_to, allocated_by, allocated_at, remarks, is_active
                 FROM case_allocations WHERE case_id = ? AND is_active = 1",
                [case_id],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(allocation)
    }

    /// Full allocation history for a case, oldest first.
    pub fn history_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<CaseAllocation>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT allocation_id, case_id, allocated_to, allocated_by, allocated_at, remarks, is_active
             FROM case_allocations WHERE case_id = ? ORDER BY allocation_id",
        )?;

        let allocations = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(allocations)
    }

    /// Number of cases currently allocated to a user, shown as workload on the
    /// allocation page.
    pub fn active_count_for_user(conn: &Connection, username: &str) -> Result<i64, TathyaError> {
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM case_allocations WHERE allocated_to = ? AND is_active = 1",
                [username],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(count)
    }

    fn map_row(row: &Row) -> rusqlite::Result<CaseAllocation> {
        Ok(CaseAllocation {
            allocation_id: row.get(0)?,
            case_id: row.get(1)?,
            allocated_to: row.get(2)?,
            allocated_by: row.get(3)?,
            allocated_at: row.get(4)?,
            remarks: row.get(5)?,
            is_active: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{Cases, NewCase};
    use crate::db::Database;
    use crate::status;

    fn test_case(conn: &Connection) -> String {
        Cases::create(conn, &NewCase::test_fixture(), status::SUBMITTED, "maya")
            .unwrap()
            .case_id
    }

    #[test]
    fn test_allocate_and_fetch_active() {
        let conn = Database::test_connection();
        let case_id = test_case(&conn);

        let allocation =
            Allocations::allocate(&conn, &case_id, "vinod", "admin", Some("priority")).unwrap();
        assert!(allocation.is_active);

        let active = Allocations::active_for_case(&conn, &case_id).unwrap().unwrap();
        assert_eq!(active.allocated_to, "vinod");
        assert_eq!(active.remarks.as_deref(), Some("priority"));
    }

    #[test]
    fn test_reallocation_keeps_one_active_row() {
        let conn = Database::test_connection();
        let case_id = test_case(&conn);

        Allocations::allocate(&conn, &case_id, "vinod", "admin", None).unwrap();
        Allocations::allocate(&conn, &case_id, "kavita", "admin", Some("workload rebalance")).unwrap();

        let active_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM case_allocations WHERE case_id = ? AND is_active = 1",
                [case_id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(active_count, 1);

        let active = Allocations::active_for_case(&conn, &case_id).unwrap().unwrap();
        assert_eq!(active.allocated_to, "kavita");

        let history = Allocations::history_for_case(&conn, &case_id).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert!(history[1].is_active);
    }

    #[test]
    fn test_active_count_for_user() {
        let conn = Database::test_connection();
        let first = test_case(&conn);
        let second = test_case(&conn);

        Allocations::allocate(&conn, &first, "vinod", "admin", None).unwrap();
        Allocations::allocate(&conn, &second, "vinod", "admin", None).unwrap();
        assert_eq!(Allocations::active_count_for_user(&conn, "vinod").unwrap(), 2);

        // Reassigning one away drops the count
        Allocations::allocate(&conn, &second, "kavita", "admin", None).unwrap();
        assert_eq!(Allocations::active_count_for_user(&conn, "vinod").unwrap(), 1);
        assert_eq!(Allocations::active_count_for_user(&conn, "kavita").unwrap(), 1);

        assert_eq!(Allocations::active_count_for_user(&conn, "nobody").unwrap(), 0);
    }

    #[test]
    fn test_no_allocation_yet() {
        let conn = Database::test_connection();
        let case_id = test_case(&conn);
        assert!(Allocations::active_for_case(&conn, &case_id).unwrap().is_none());
        assert!(Allocations::history_for_case(&conn, &case_id).unwrap().is_empty());
    }
}
