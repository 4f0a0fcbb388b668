use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::TathyaError;

#[derive(Debug, Clone, Serialize)]
pub struct InvestigationDetails {
    pub investigation_id: i64,
    pub case_id: String,
    pub investigator: String,
    pub findings: Option<String>,
    pub modus_operandi: Option<String>,
    pub amount_involved: Option<f64>,
    pub fraud_confirmed: Option<String>,
    pub field_visit_done: Option<String>,
    pub visit_notes: Option<String>,
    pub started_at: i64,
    pub submitted_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// Form payload for saving investigation work in progress. Fields left null
/// clear the stored value, matching how the form round-trips its inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvestigationUpdate {
    pub findings: Option<String>,
    pub modus_operandi: Option<String>,
    pub amount_involved: Option<f64>,
    pub fraud_confirmed: Option<String>,
    pub field_visit_done: Option<String>,
    pub visit_notes: Option<String>,
}

/// Investigation rounds. One row per case per round; a send-back from review
/// starts a fresh round while the earlier row keeps that round's record.
pub struct Investigations;

impl Investigations {
    pub fn start_round(
        conn: &Connection,
        case_id: &str,
        investigator: &str,
    ) -> Result<InvestigationDetails, TathyaError> {
        let now = chrono::Utc::now().timestamp();
        let investigation_id: i64 = conn
            .query_row(
                "INSERT INTO investigation_details (case_id, investigator, started_at)
                 VALUES (?, ?, ?)
                 RETURNING investigation_id",
                params![case_id, investigator, now],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        Ok(InvestigationDetails {
            investigation_id,
            case_id: case_id.to_string(),
            investigator: investigator.to_string(),
            findings: None,
            modus_operandi: None,
            amount_involved: None,
            fraud_confirmed: None,
            field_visit_done: None,
            visit_notes: None,
            started_at: now,
            submitted_at: None,
            updated_at: None,
        })
    }

    /// The round still being worked on (not yet submitted), if any.
    pub fn open_round(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Option<InvestigationDetails>, TathyaError> {
        let round = conn
            .query_row(
                "SELECT investigation_id, case_id, investigator, findings, modus_operandi, amount_involved,
                        fraud_confirmed, field_visit_done, visit_notes, started_at, submitted_at, updated_at
                 FROM investigation_details
                 WHERE case_id = ? AND submitted_at IS NULL
                 ORDER BY investigation_id DESC LIMIT 1",
                [case_id],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(round)
    }

    pub fn list_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<InvestigationDetails>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT investigation_id, case_id, investigator, findings, modus_operandi, amount_involved,
                    fraud_confirmed, field_visit_done, visit_notes, started_at, submitted_at, updated_at
             FROM investigation_details WHERE case_id = ? ORDER BY investigation_id",
        )?;

        let rounds = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(rounds)
    }

    /// Saves work-in-progress fields on a round. Returns false for an unknown
    /// or already-submitted round.
    pub fn save(
        conn: &Connection,
        investigation_id: i64,
        update: &InvestigationUpdate,
    ) -> Result<bool, TathyaError> {
        let rows = conn
            .execute(
                "UPDATE investigation_details SET
                    findings = ?, modus_operandi = ?, amount_involved = ?, fraud_confirmed = ?,
                    field_visit_done = ?, visit_notes = ?, updated_at = ?
                 WHERE investigation_id = ? AND submitted_at IS NULL",
                params![
                    update.findings,
                    update.modus_operandi,
                    update.amount_involved,
                    update.fraud_confirmed,
                    update.field_visit_done,
                    update.visit_notes,
                    chrono::Utc::now().timestamp(),
                    investigation_id
                ],
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(rows > 0)
    }

    /// Marks a round submitted. Returns false if it was already submitted or
    /// does not exist.
    pub fn submit(conn: &Connection, investigation_id: i64) -> Result<bool, TathyaError> {
        let rows = conn
            .execute(
                "UPDATE investigation_details SET submitted_at = ? WHERE investigation_id = ? AND submitted_at IS NULL",
                params![chrono::Utc::now().timestamp(), investigation_id],
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(rows > 0)
    }

    fn map_row(row: &Row) -> rusqlite::Result<InvestigationDetails> {
        Ok(InvestigationDetails {
            investigation_id: row.get(0)?,
            case_id: row.get(1)?,
            investigator: row.get(2)?,
            findings: row.get(3)?,
            modus_operandi: row.get(4)?,
            amount_involved: row.get(5)?,
            fraud_confirmed: row.get(6)?,
            field_visit_done: row.get(7)?,
            visit_notes: row.get(8)?,
            started_at: row.get(9)?,
            submitted_at: row.get(10)?,
            updated_at: row.get(11)?,
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
        let case_id = Cases::create(&conn, &NewCase::test_fixture(), status::ALLOCATED, "maya")
            .unwrap()
            .case_id;
        (conn, case_id)
    }

    #[test]
    fn test_round_lifecycle() {
        let (conn, case_id) = setup();

        let round = Investigations::start_round(&conn, &case_id, "vinod").unwrap();
        assert!(Investigations::open_round(&conn, &case_id).unwrap().is_some());

        let update = InvestigationUpdate {
            findings: Some("Salary slips forged".to_string()),
            modus_operandi: Some("Fabricated employer".to_string()),
            amount_involved: Some(250_000.0),
            fraud_confirmed: Some("Yes".to_string()),
            field_visit_done: Some("Yes".to_string()),
            visit_notes: Some("Employer premises vacant".to_string()),
        };
        assert!(Investigations::save(&conn, round.investigation_id, &update).unwrap());

        let saved = Investigations::open_round(&conn, &case_id).unwrap().unwrap();
        assert_eq!(saved.findings.as_deref(), Some("Salary slips forged"));
        assert_eq!(saved.amount_involved, Some(250_000.0));
        assert!(saved.updated_at.is_some());

        assert!(Investigations::submit(&conn, round.investigation_id).unwrap());
        assert!(Investigations::open_round(&conn, &case_id).unwrap().is_none());

        let latest = Investigations::latest_round(&conn, &case_id).unwrap().unwrap();
        assert!(latest.submitted_at.is_some());
    }

    #[test]
    fn test_submitted_round_is_frozen() {
        let (conn, case_id) = setup();
        let round = Investigations::start_round(&conn, &case_id, "vinod").unwrap();
        Investigations::submit(&conn, round.investigation_id).unwrap();

        // Second submit and late saves both miss
        assert!(!Investigations::submit(&conn, round.investigation_id).unwrap());
        assert!(!Investigations::save(&conn, round.investigation_id, &InvestigationUpdate::default()).unwrap());
    }

    #[test]
    fn test_send_back_starts_new_round() {
        let (conn, case_id) = setup();

        let first = Investigations::start_round(&conn, &case_id, "vinod").unwrap();
        Investigations::submit(&conn, first.investigation_id).unwrap();

        let second = Investigations::start_round(&conn, &case_id, "vinod").unwrap();
        assert_ne!(first.investigation_id, second.investigation_id);

        let rounds = Investigations::list_for_case(&conn, &case_id).unwrap();
        assert_eq!(rounds.len(), 2);
        assert!(rounds[0].submitted_at.is_some());
        assert!(rounds[1].submitted_at.is_none());

        let open = Investigations::open_round(&conn, &case_id).unwrap().unwrap();
        assert_eq!(open.investigation_id, second.investigation_id);
    }
}
