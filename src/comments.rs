use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::error::TathyaError;

#[derive(Debug, Clone, Serialize)]
pub struct CaseComment {
    pub comment_id: i64,
    pub case_id: String,
    pub comment_text: String,
    pub commented_by: String,
    pub commented_at: i64,
}

/// Append-only case comments.
pub struct Comments;

impl Comments {
    pub fn add(
        conn: &Connection,
        case_id: &str,
        comment_text: &str,
        commented_by: &str,
    ) -> Result<CaseComment, TathyaError> {
        let now = chrono::Utc::now().timestamp();
        let comment_id: i64 = conn
            .query_row(
                "INSERT INTO case_comments (case_id, comment_text, commented_by, commented_at)
                 VALUES (?, ?, ?, ?)
                 RETURNING comment_id",
                params![case_id, comment_text, commented_by, now],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        Ok(CaseComment {
            comment_id,
            case_id: case_id.to_string(),
            comment_text: comment_text.to_string(),
            commented_by: commented_by.to_string(),
            commented_at: now,
        })
    }

    /// Comments for one case, oldest first.
    pub fn list_for_case(conn: &Connection, case_id: &str) -> Result<Vec<CaseComment>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT comment_id, case_id, comment_text, commented_by, commented_at
             FROM case_comments WHERE case_id = ? ORDER BY comment_id",
        )?;

        let comments = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(comments)
    }

    fn map_row(row: &Row) -> rusqlite::Result<CaseComment> {
        Ok(CaseComment {
            comment_id: row.get(0)?,
            case_id: row.get(1)?,
            comment_text: row.get(2)?,
            commented_by: row.get(3)?,
            commented_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{Cases, NewCase};
    use crate::db::Database;
    use crate::status;

    fn test_conn() -> Connection {
        Database::test_connection()
    }

    fn seed_case(conn: &Connection) -> String {
        let case = Cases::create(conn, &NewCase::test_fixture(), status::DRAFT, "maya").unwrap();
        case.case_id
    }

    #[test]
    fn test_add_and_list() {
        let conn = test_conn();
        let case_id = seed_case(&conn);

        Comments::add(&conn, &case_id, "first note", "maya").unwrap();
        Comments::add(&conn, &case_id, "second note", "arun").unwrap();

        let comments = Comments::list_for_case(&conn, &case_id).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment_text, "first note");
        assert_eq!(comments[1].commented_by, "arun");
    }

    #[test]
    fn test_comment_on_unknown_case_rejected() {
        let conn = test_conn();
        // FK enforcement: case_comments.case_id must reference a real case
        let result = Comments::add(&conn, "CASE-NOPE", "text", "maya");
        assert!(result.is_err());
    }
}
