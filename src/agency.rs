use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::TathyaError;

#[derive(Debug, Clone, Serialize)]
pub struct AgencyResponse {
    pub response_id: i64,
    pub case_id: String,
    pub agency_name: String,
    pub request_detail: String,
    pub response_detail: Option<String>,
    pub requested_by: String,
    pub requested_at: i64,
    pub responded_at: Option<i64>,
}

/// External agency information requests (bureau pulls, employer checks,
/// forensic reports). A request stays open until its response is recorded.
pub struct AgencyResponses;

impl AgencyResponses {
    pub fn create_request(
        conn: &Connection,
        case_id: &str,
        agency_name: &str,
        request_detail: &str,
        requested_by: &str,
    ) -> Result<AgencyResponse, TathyaError> {
        let now = chrono::Utc::now().timestamp();
        let response_id: i64 = conn
            .query_row(
                "INSERT INTO agency_responses (case_id, agency_name, request_detail, requested_by, requested_at)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING response_id",
                params![case_id, agency_name, request_detail, requested_by, now],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        Ok(AgencyResponse {
            response_id,
            case_id: case_id.to_string(),
            agency_name: agency_name.to_string(),
            request_detail: request_detail.to_string(),
            response_detail: None,
            requested_by: requested_by.to_string(),
            requested_at: now,
            responded_at: None,
        })
    }

    /// Records the agency's reply against an open request. Returns false if
    /// the request is unknown or already answered.
    pub fn record_response(
        conn: &Connection,
        response_id: i64,
        response_detail: &str,
    ) -> Result<bool, TathyaError> {
        let rows = conn
            .execute(
                "UPDATE agency_responses SET response_detail = ?, responded_at = ?
                 WHERE response_id = ? AND responded_at IS NULL",
                params![response_detail, chrono::Utc::now().timestamp(), response_id],
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(rows > 0)
    }

    pub fn get_by_id(
        conn: &Connection,
        response_id: i64,
    ) -> Result<Option<AgencyResponse>, TathyaError> {
        let response = conn
            .query_row(
                "SELECT response_id, case_id, agency_name, request_detail, response_detail,
                        requested_by, requested_at, responded_at
                 FROM agency_responses WHERE response_id = ?",
                [response_id],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(response)
    }

    pub fn list_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<AgencyResponse>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT response_id, case_id, agency_name, request_detail, response_detail,
                    requested_by, requested_at, responded_at
             FROM agency_responses WHERE case_id = ? ORDER BY response_id",
        )?;

        let responses = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(responses)
    }

    pub fn open_count_for_case(conn: &Connection, case_id: &str) -> Result<i64, TathyaError> {
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM agency_responses WHERE case_id = ? AND responded_at IS NULL",
                [case_id],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(count)
    }

    fn map_row(row: &Row) -> rusqlite::Result<AgencyResponse> {
        Ok(AgencyResponse {
            response_id: row.get(0)?,
            case_id: row.get(1)?,
            agency_name: row.get(2)?,
            request_detail: row.get(3)?,
            response_detail: row.get(4)?,
            requested_by: row.get(5)?,
            requested_at: row.get(6)?,
            responded_at: row.get(7)?,
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
        let case_id = Cases::create(&conn, &NewCase::test_fixture(), status::UNDER_INVESTIGATION, "vinod")
            .unwrap()
            .case_id;
        (conn, case_id)
    }

    #[test]
    fn test_request_and_response() {
        let (conn, case_id) = setup();

        let request = AgencyResponses::create_request(
            &conn,
            &case_id,
            "Credit Bureau",
            "Full tradeline history for PAN",
            "vinod",
        )
        .unwrap();
        assert_eq!(AgencyResponses::open_count_for_case(&conn, &case_id).unwrap(), 1);

        assert!(AgencyResponses::record_response(&conn, request.response_id, "Report attached").unwrap());
        assert_eq!(AgencyResponses::open_count_for_case(&conn, &case_id).unwrap(), 0);

        let stored = AgencyResponses::get_by_id(&conn, request.response_id).unwrap().unwrap();
        assert_eq!(stored.response_detail.as_deref(), Some("Report attached"));
        assert!(stored.responded_at.is_some());
    }

    #[test]
    fn test_response_recorded_once() {
        let (conn, case_id) = setup();
        let request =
            AgencyResponses::create_request(&conn, &case_id, "Employer", "Verify employment", "vinod").unwrap();

        assert!(AgencyResponses::record_response(&conn, request.response_id, "Employee confirmed").unwrap());
        assert!(!AgencyResponses::record_response(&conn, request.response_id, "Second reply").unwrap());

        let stored = AgencyResponses::get_by_id(&conn, request.response_id).unwrap().unwrap();
        assert_eq!(stored.response_detail.as_deref(), Some("Employee confirmed"));
    }

    #[test]
    fn test_unknown_request() {
        let (conn, _case_id) = setup();
        assert!(!AgencyResponses::record_response(&conn, 9999, "reply").unwrap());
        assert!(AgencyResponses::get_by_id(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn test_list_orders_by_creation() {
        let (conn, case_id) = setup();
        AgencyResponses::create_request(&conn, &case_id, "Bureau", "first", "vinod").unwrap();
        AgencyResponses::create_request(&conn, &case_id, "Police", "second", "vinod").unwrap();

        let all = AgencyResponses::list_for_case(&conn, &case_id).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].agency_name, "Bureau");
        assert_eq!(all[1].agency_name, "Police");
    }
}
