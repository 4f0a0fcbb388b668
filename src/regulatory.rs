use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::error::TathyaError;

/// Report types offered by the regulatory filing page. The column itself is
/// free text, so historical rows may carry other labels.
pub const REPORT_TYPES: [&str; 5] = ["FMR-1", "FMR-2", "FMR-3", "CRILC", "Police Complaint"];

#[derive(Debug, Clone, Serialize)]
pub struct RegulatoryReport {
    pub report_id: i64,
    pub case_id: String,
    pub report_type: String,
    pub reference_number: Option<String>,
    pub report_date: String,
    pub filed_by: String,
    pub filed_at: i64,
    pub remarks: Option<String>,
}

pub struct RegulatoryReports;

impl RegulatoryReports {
    pub fn file_report(
        conn: &Connection,
        case_id: &str,
        report_type: &str,
        reference_number: Option<&str>,
        report_date: &str,
        remarks: Option<&str>,
        filed_by: &str,
    ) -> Result<RegulatoryReport, TathyaError> {
        let now = chrono::Utc::now().timestamp();
        let report_id: i64 = conn
            .query_row(
                "INSERT INTO regulatory_reports (case_id, report_type, reference_number, report_date, filed_by, filed_at, remarks)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 RETURNING report_id",
                params![case_id, report_type, reference_number, report_date, filed_by, now, remarks],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        Ok(RegulatoryReport {
            report_id,
            case_id: case_id.to_string(),
            report_type: report_type.to_string(),
            reference_number: reference_number.map(str::to_string),
            report_date: report_date.to_string(),
            filed_by: filed_by.to_string(),
            filed_at: now,
            remarks: remarks.map(str::to_string),
        })
    }

    pub fn list_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<RegulatoryReport>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT report_id, case_id, report_type, reference_number, report_date, filed_by, filed_at, remarks
             FROM regulatory_reports WHERE case_id = ? ORDER BY report_id",
        )?;

        let reports = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(reports)
    }

    pub fn count_for_case(conn: &Connection, case_id: &str) -> Result<i64, TathyaError> {
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM regulatory_reports WHERE case_id = ?",
                [case_id],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(count)
    }

    fn map_row(row: &Row) -> rusqlite::Result<RegulatoryReport> {
        Ok(RegulatoryReport {
            report_id: row.get(0)?,
            case_id: row.get(1)?,
            report_type: row.get(2)?,
            reference_number: row.get(3)?,
            report_date: row.get(4)?,
            filed_by: row.get(5)?,
            filed_at: row.get(6)?,
            remarks: row.get(7)?,
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
        let case_id = Cases::create(&conn, &NewCase::test_fixture(), status::ACTIONS_COMPLETED, "rhea")
            .unwrap()
            .case_id;
        (conn, case_id)
    }

    #[test]
    fn test_file_and_list() {
        let (conn, case_id) = setup();

        let report = RegulatoryReports::file_report(
            &conn,
            &case_id,
            "FMR-1",
            Some("FMR1/2026/0042"),
            "2026-08-20",
            Some("Initial fraud report"),
            "rhea",
        )
        .unwrap();
        assert_eq!(report.report_type, "FMR-1");
        assert_eq!(report.reference_number.as_deref(), Some("FMR1/2026/0042"));

        RegulatoryReports::file_report(&conn, &case_id, "Police Complaint", None, "2026-08-21", None, "rhea")
            .unwrap();

        let all = RegulatoryReports::list_for_case(&conn, &case_id).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].report_type, "FMR-1");
        assert_eq!(all[1].report_type, "Police Complaint");
        assert!(all[1].reference_number.is_none());
        assert_eq!(RegulatoryReports::count_for_case(&conn, &case_id).unwrap(), 2);
    }

    #[test]
    fn test_free_text_report_type_accepted() {
        // The table has no CHECK on report_type; the dropdown list is a UI
        // convention only.
        let (conn, case_id) = setup();
        let report = RegulatoryReports::file_report(&conn, &case_id, "FMR-999", None, "2026-08-21", None, "rhea")
            .unwrap();
        assert!(!REPORT_TYPES.contains(&report.report_type.as_str()));
        assert_eq!(RegulatoryReports::count_for_case(&conn, &case_id).unwrap(), 1);
    }
}
