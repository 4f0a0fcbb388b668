use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::error::TathyaError;

/// Case id used for audit rows that are not tied to a case (admin actions).
pub const ADMIN_CASE_ID: &str = "-";

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub audit_id: i64,
    pub case_id: String,
    pub action: String,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    pub performed_by: String,
    pub performed_at: i64,
    pub details: Option<String>,
}

/// Append-only audit trail. Rows are never updated or deleted.
pub struct Audit;

impl Audit {
    pub fn record(
        conn: &Connection,
        case_id: &str,
        action: &str,
        old_status: Option<&str>,
        new_status: Option<&str>,
        performed_by: &str,
        details: Option<&str>,
    ) -> Result<i64, TathyaError> {
        let audit_id: i64 = conn
            .query_row(
                "INSERT INTO audit_log (case_id, action, old_status, new_status, performed_by, performed_at, details)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 RETURNING audit_id",
                params![
                    case_id,
                    action,
                    old_status,
                    new_status,
                    performed_by,
                    chrono::Utc::now().timestamp(),
                    details
                ],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(audit_id)
    }

    /// Records an admin action under the synthetic case id.
    pub fn record_admin(
        conn: &Connection,
        action: &str,
        performed_by: &str,
        details: Option<&str>,
    ) -> Result<i64, TathyaError> {
        Self::record(conn, ADMIN_CASE_ID, action, None, None, performed_by, details)
    }

    /// Audit rows for one case in the order they were written.
    pub fn list_for_case(conn: &Connection, case_id: &str) -> Result<Vec<AuditEntry>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT audit_id, case_id, action, old_status, new_status, performed_by, performed_at, details
             FROM audit_log WHERE case_id = ? ORDER BY audit_id",
        )?;

        let entries = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(entries)
    }

    fn map_row(row: &Row) -> rusqlite::Result<AuditEntry> {
        Ok(AuditEntry {
            audit_id: row.get(0)?,
            case_id: row.get(1)?,
            action: row.get(2)?,
            old_status: row.get(3)?,
            new_status: row.get(4)?,
            performed_by: row.get(5)?,
            performed_at: row.get(6)?,
            details: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn test_conn() -> Connection {
        Database::test_connection()
    }

    #[test]
    fn test_record_and_list_in_order() {
        let conn = test_conn();

        Audit::record(&conn, "CASE-X", "Case Created", None, Some("Draft"), "maya", None).unwrap();
        Audit::record(
            &conn,
            "CASE-X",
            "Status Changed",
            Some("Draft"),
            Some("Submitted"),
            "maya",
            Some("submitted for allocation"),
        )
        .unwrap();
        Audit::record(&conn, "CASE-Y", "Case Created", None, Some("Draft"), "arun", None).unwrap();

        let entries = Audit::list_for_case(&conn, "CASE-X").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "Case Created");
        assert_eq!(entries[1].old_status.as_deref(), Some("Draft"));
        assert_eq!(entries[1].new_status.as_deref(), Some("Submitted"));
        assert_eq!(entries[1].details.as_deref(), Some("submitted for allocation"));
    }

    #[test]
    fn test_admin_actions_use_synthetic_case_id() {
        let conn = test_conn();
        Audit::record_admin(&conn, "User Created", "admin", Some("username=rita")).unwrap();

        let entries = Audit::list_for_case(&conn, ADMIN_CASE_ID).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "User Created");
        assert_eq!(entries[0].old_status, None);
    }
}
