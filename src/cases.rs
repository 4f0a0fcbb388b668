use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::audit::Audit;
use crate::db::Database;
use crate::error::TathyaError;

/// Form payload for creating or editing a case. Everything beyond the five
/// required fields is optional; the entry form sends empty optionals as null.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCase {
    pub category: String,
    pub case_type: String,
    pub customer_name: String,
    pub customer_id: Option<String>,
    pub pan: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub branch: Option<String>,
    pub region: Option<String>,
    pub product: Option<String>,
    pub loan_account_number: Option<String>,
    pub loan_amount: Option<f64>,
    pub disbursement_date: Option<String>,
    pub case_date: String,
    pub description: String,
}

impl NewCase {
    /// Required-field validation. Returns one message per missing field so the
    /// form can show them all at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.category.trim().is_empty() {
            errors.push("category is required".to_string());
        }
        if self.case_type.trim().is_empty() {
            errors.push("case_type is required".to_string());
        }
        if self.customer_name.trim().is_empty() {
            errors.push("customer_name is required".to_string());
        }
        if self.case_date.trim().is_empty() {
            errors.push("case_date is required".to_string());
        }
        if self.description.trim().is_empty() {
            errors.push("description is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[cfg(test)]
    pub fn test_fixture() -> Self {
        NewCase {
            category: "Lending".to_string(),
            case_type: "Forged Documents".to_string(),
            customer_name: "S. Kumar".to_string(),
            customer_id: Some("CU-1001".to_string()),
            pan: Some("ABCPK1234F".to_string()),
            mobile: None,
            email: None,
            address: None,
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            pincode: None,
            branch: Some("Pune Main".to_string()),
            region: Some("West".to_string()),
            product: Some("Home Loan".to_string()),
            loan_account_number: Some("LAN00012345".to_string()),
            loan_amount: Some(2_500_000.0),
            disbursement_date: Some("2024-11-02".to_string()),
            case_date: "2025-03-18".to_string(),
            description: "Income documents appear fabricated".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Case {
    pub case_id: String,
    pub category: String,
    pub case_type: String,
    pub status: String,
    pub customer_name: String,
    pub customer_id: Option<String>,
    pub pan: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub branch: Option<String>,
    pub region: Option<String>,
    pub product: Option<String>,
    pub loan_account_number: Option<String>,
    pub loan_amount: Option<f64>,
    pub disbursement_date: Option<String>,
    pub case_date: String,
    pub description: String,
    pub created_by: String,
    pub created_at: i64,
    pub updated_by: Option<String>,
    pub updated_at: Option<i64>,
}

/// Filters for the case list page. All optional; `search` matches case id,
/// customer name or loan account number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseFilter {
    pub status: Option<String>,
    pub category: Option<String>,
    pub created_by: Option<String>,
    pub allocated_to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const CASE_COLUMNS: &str = "case_id, category, case_type, status, customer_name, customer_id, pan, mobile, email, \
     address, city, state, pincode, branch, region, product, loan_account_number, loan_amount, \
     disbursement_date, case_date, description, created_by, created_at, updated_by, updated_at";

pub struct Cases;

impl Cases {
    /// Allocates the next case id, `CASE-YYYYMM-NNNNN`. The sequence lives in
    /// the meta table and never resets, including across month boundaries.
    /// Caller must hold a write transaction.
    fn next_case_id(conn: &Connection) -> Result<String, TathyaError> {
        let seq: String = conn
            .query_row("SELECT value FROM meta WHERE key = 'case_seq'", [], |row| row.get(0))
            .map_err(TathyaError::DatabaseError)?;

        let next = seq
            .parse::<i64>()
            .map_err(|_| TathyaError::Error(format!("Invalid case_seq value: '{}'", seq)))?
            + 1;

        conn.execute(
            "UPDATE meta SET value = ? WHERE key = 'case_seq'",
            params![next.to_string()],
        )
        .map_err(TathyaError::DatabaseError)?;

        let year_month = chrono::Utc::now().format("%Y%m");
        Ok(format!("CASE-{}-{:05}", year_month, next))
    }

    /// Creates a case with the given initial status (`Draft` or `Submitted`)
    /// and writes the creation audit row. Runs in one immediate transaction so
    /// concurrent submissions cannot collide on the sequence.
    pub fn create(
        conn: &Connection,
        new_case: &NewCase,
        initial_status: &str,
        created_by: &str,
    ) -> Result<Case, TathyaError> {
        Database::immediate_transaction(conn, |c| {
            let case_id = Self::next_case_id(c)?;
            let now = chrono::Utc::now().timestamp();

            c.execute(
                "INSERT INTO cases (
                    case_id, category, case_type, status, customer_name, customer_id, pan, mobile, email,
                    address, city, state, pincode, branch, region, product, loan_account_number, loan_amount,
                    disbursement_date, case_date, description, created_by, created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    case_id,
                    new_case.category,
                    new_case.case_type,
                    initial_status,
                    new_case.customer_name,
                    new_case.customer_id,
                    new_case.pan,
                    new_case.mobile,
                    new_case.email,
                    new_case.address,
                    new_case.city,
                    new_case.state,
                    new_case.pincode,
                    new_case.branch,
                    new_case.region,
                    new_case.product,
                    new_case.loan_account_number,
                    new_case.loan_amount,
                    new_case.disbursement_date,
                    new_case.case_date,
                    new_case.description,
                    created_by,
                    now
                ],
            )
            .map_err(TathyaError::DatabaseError)?;

            Audit::record(
                c,
                &case_id,
                "Case Created",
                None,
                Some(initial_status),
                created_by,
                None,
            )?;

            Self::get_by_id(c, &case_id)?
                .ok_or_else(|| TathyaError::Error(format!("Case {} vanished after insert", case_id)))
        })
    }

    pub fn get_by_id(conn: &Connection, case_id: &str) -> Result<Option<Case>, TathyaError> {
        let sql = format!("SELECT {} FROM cases WHERE case_id = ?", CASE_COLUMNS);
        let case = conn
            .query_row(&sql, [case_id], Self::map_row)
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(case)
    }

    /// Rewrites the form fields of an existing case (draft editing). Status is
    /// untouched. Returns false if the case does not exist.
    pub fn update_details(
        conn: &Connection,
        case_id: &str,
        new_case: &NewCase,
        updated_by: &str,
    ) -> Result<bool, TathyaError> {
        let now = chrono::Utc::now().timestamp();

        let rows = conn
            .execute(
                "UPDATE cases SET
                    category = ?, case_type = ?, customer_name = ?, customer_id = ?, pan = ?, mobile = ?,
                    email = ?, address = ?, city = ?, state = ?, pincode = ?, branch = ?, region = ?,
                    product = ?, loan_account_number = ?, loan_amount = ?, disbursement_date = ?,
                    case_date = ?, description = ?, updated_by = ?, updated_at = ?
                 WHERE case_id = ?",
                params![
                    new_case.category,
                    new_case.case_type,
                    new_case.customer_name,
                    new_case.customer_id,
                    new_case.pan,
                    new_case.mobile,
                    new_case.email,
                    new_case.address,
                    new_case.city,
                    new_case.state,
                    new_case.pincode,
                    new_case.branch,
                    new_case.region,
                    new_case.product,
                    new_case.loan_account_number,
                    new_case.loan_amount,
                    new_case.disbursement_date,
                    new_case.case_date,
                    new_case.description,
                    updated_by,
                    now,
                    case_id
                ],
            )
            .map_err(TathyaError::DatabaseError)?;

        if rows > 0 {
            Audit::record(conn, case_id, "Case Updated", None, None, updated_by, None)?;
        }

        Ok(rows > 0)
    }

    /// The status write every workflow page funnels through: a direct UPDATE
    /// plus an audit row. `new_status` is persisted as-is; there is no
    /// transition table and no membership check. Returns false if the case
    /// does not exist.
    pub fn update_status(
        conn: &Connection,
        case_id: &str,
        new_status: &str,
        user: &str,
        note: Option<&str>,
    ) -> Result<bool, TathyaError> {
        let old_status: Option<String> = conn
            .query_row("SELECT status FROM cases WHERE case_id = ?", [case_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(TathyaError::DatabaseError)?;

        let old_status = match old_status {
            Some(s) => s,
            None => return Ok(false),
        };

        conn.execute(
            "UPDATE cases SET status = ?, updated_by = ?, updated_at = ? WHERE case_id = ?",
            params![new_status, user, chrono::Utc::now().timestamp(), case_id],
        )
        .map_err(TathyaError::DatabaseError)?;

        Audit::record(
            conn,
            case_id,
            "Status Changed",
            Some(&old_status),
            Some(new_status),
            user,
            note,
        )?;

        Ok(true)
    }

    /// Filtered, paginated case listing for the case list page.
    pub fn list(conn: &Connection, filter: &CaseFilter) -> Result<Vec<Case>, TathyaError> {
        let mut sql = format!("SELECT {} FROM cases WHERE 1=1", CASE_COLUMNS);
        let mut bind: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            bind.push(Box::new(status.clone()));
        }
        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            bind.push(Box::new(category.clone()));
        }
        if let Some(created_by) = &filter.created_by {
            sql.push_str(" AND created_by = ?");
            bind.push(Box::new(created_by.clone()));
        }
        if let Some(allocated_to) = &filter.allocated_to {
            sql.push_str(
                " AND case_id IN (SELECT case_id FROM case_allocations WHERE allocated_to = ? AND is_active = 1)",
            );
            bind.push(Box::new(allocated_to.clone()));
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            sql.push_str(
                " AND (case_id LIKE ? OR customer_name LIKE ? OR loan_account_number LIKE ?)",
            );
            bind.push(Box::new(pattern.clone()));
            bind.push(Box::new(pattern.clone()));
            bind.push(Box::new(pattern));
        }

        sql.push_str(" ORDER BY created_at DESC, case_id DESC LIMIT ? OFFSET ?");
        bind.push(Box::new(filter.limit.unwrap_or(50)));
        bind.push(Box::new(filter.offset.unwrap_or(0)));

        let mut stmt = conn.prepare(&sql)?;
        let cases = stmt
            .query_map(params_from_iter(bind), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(cases)
    }

    /// Cases whose status is in the given set, oldest first. This is the
    /// "queue" query each workflow page runs with its own status list.
    pub fn list_by_statuses(conn: &Connection, statuses: &[&str]) -> Result<Vec<Case>, TathyaError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM cases WHERE status IN ({}) ORDER BY created_at, case_id",
            CASE_COLUMNS, placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let cases = stmt
            .query_map(params_from_iter(statuses.iter()), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(cases)
    }

    /// Queue variant for investigators: restricted to cases actively allocated
    /// to the given username.
    pub fn list_allocated_in_statuses(
        conn: &Connection,
        allocated_to: &str,
        statuses: &[&str],
    ) -> Result<Vec<Case>, TathyaError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM cases
             WHERE status IN ({})
               AND case_id IN (SELECT case_id FROM case_allocations WHERE allocated_to = ? AND is_active = 1)
             ORDER BY created_at, case_id",
            CASE_COLUMNS, placeholders
        );

        let mut bind: Vec<Box<dyn rusqlite::types::ToSql>> = statuses
            .iter()
            .map(|s| Box::new(s.to_string()) as Box<dyn rusqlite::types::ToSql>)
            .collect();
        bind.push(Box::new(allocated_to.to_string()));

        let mut stmt = conn.prepare(&sql)?;
        let cases = stmt
            .query_map(params_from_iter(bind), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(cases)
    }

    pub fn count_all(conn: &Connection) -> Result<i64, TathyaError> {
        let count = conn
            .query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))
            .map_err(TathyaError::DatabaseError)?;
        Ok(count)
    }

    /// Case counts grouped by status, descending.
    pub fn count_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM cases GROUP BY status ORDER BY COUNT(*) DESC, status",
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(counts)
    }

    /// Most recently created cases for the dashboard.
    pub fn recent(conn: &Connection, limit: i64) -> Result<Vec<Case>, TathyaError> {
        let sql = format!(
            "SELECT {} FROM cases ORDER BY created_at DESC, case_id DESC LIMIT ?",
            CASE_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let cases = stmt
            .query_map([limit], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(cases)
    }

    fn map_row(row: &Row) -> rusqlite::Result<Case> {
        Ok(Case {
            case_id: row.get(0)?,
            category: row.get(1)?,
            case_type: row.get(2)?,
            status: row.get(3)?,
            customer_name: row.get(4)?,
            customer_id: row.get(5)?,
            pan: row.get(6)?,
            mobile: row.get(7)?,
            email: row.get(8)?,
            address: row.get(9)?,
            city: row.get(10)?,
            state: row.get(11)?,
            pincode: row.get(12)?,
            branch: row.get(13)?,
            region: row.get(14)?,
            product: row.get(15)?,
            loan_account_number: row.get(16)?,
            loan_amount: row.get(17)?,
            disbursement_date: row.get(18)?,
            case_date: row.get(19)?,
            description: row.get(20)?,
            created_by: row.get(21)?,
            created_at: row.get(22)?,
            updated_by: row.get(23)?,
            updated_at: row.get(24)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::Allocations;
    use crate::audit::Audit;
    use crate::db::Database;
    use crate::status;
    use pretty_assertions::assert_eq;

    fn test_conn() -> Connection {
        Database::test_connection()
    }

    #[test]
    fn test_create_generates_sequential_ids() {
        let conn = test_conn();
        let first = Cases::create(&conn, &NewCase::test_fixture(), status::DRAFT, "maya").unwrap();
        let second = Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();

        assert!(first.case_id.starts_with("CASE-"));
        assert!(first.case_id.ends_with("-00001"));
        assert!(second.case_id.ends_with("-00002"));

        let seq: String = conn
            .query_row("SELECT value FROM meta WHERE key = 'case_seq'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(seq, "2");
    }

    #[test]
    fn test_create_roundtrip_and_audit() {
        let conn = test_conn();
        let fixture = NewCase::test_fixture();
        let case = Cases::create(&conn, &fixture, status::SUBMITTED, "maya").unwrap();

        let fetched = Cases::get_by_id(&conn, &case.case_id).unwrap().unwrap();
        assert_eq!(fetched.status, "Submitted");
        assert_eq!(fetched.customer_name, fixture.customer_name);
        assert_eq!(fetched.loan_amount, fixture.loan_amount);
        assert_eq!(fetched.created_by, "maya");
        assert_eq!(fetched.updated_by, None);

        let audit = Audit::list_for_case(&conn, &case.case_id).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "Case Created");
        assert_eq!(audit[0].new_status.as_deref(), Some("Submitted"));
    }

    #[test]
    fn test_update_status_written_equals_read() {
        let conn = test_conn();
        let case = Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();

        let updated =
            Cases::update_status(&conn, &case.case_id, status::ALLOCATED, "admin", Some("to vinod"))
                .unwrap();
        assert!(updated);

        let fetched = Cases::get_by_id(&conn, &case.case_id).unwrap().unwrap();
        assert_eq!(fetched.status, status::ALLOCATED);
        assert_eq!(fetched.updated_by.as_deref(), Some("admin"));

        let audit = Audit::list_for_case(&conn, &case.case_id).unwrap();
        let last = audit.last().unwrap();
        assert_eq!(last.action, "Status Changed");
        assert_eq!(last.old_status.as_deref(), Some("Submitted"));
        assert_eq!(last.new_status.as_deref(), Some("Allocated"));
        assert_eq!(last.details.as_deref(), Some("to vinod"));
    }

    #[test]
    fn test_update_status_accepts_arbitrary_strings() {
        // The status column is free text and update_status does not validate
        // membership in the known vocabulary.
        let conn = test_conn();
        let case = Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();

        Cases::update_status(&conn, &case.case_id, "Escalated to Mars", "admin", None).unwrap();

        let fetched = Cases::get_by_id(&conn, &case.case_id).unwrap().unwrap();
        assert_eq!(fetched.status, "Escalated to Mars");
    }

    #[test]
    fn test_update_status_unknown_case_returns_false() {
        let conn = test_conn();
        let updated = Cases::update_status(&conn, "CASE-NOPE", status::ALLOCATED, "admin", None).unwrap();
        assert!(!updated);
    }

    #[test]
    fn test_update_details_rewrites_form_fields() {
        let conn = test_conn();
        let case = Cases::create(&conn, &NewCase::test_fixture(), status::DRAFT, "maya").unwrap();

        let mut edited = NewCase::test_fixture();
        edited.customer_name = "S. Kumar Jr.".to_string();
        edited.loan_amount = Some(3_000_000.0);

        assert!(Cases::update_details(&conn, &case.case_id, &edited, "maya").unwrap());

        let fetched = Cases::get_by_id(&conn, &case.case_id).unwrap().unwrap();
        assert_eq!(fetched.customer_name, "S. Kumar Jr.");
        assert_eq!(fetched.loan_amount, Some(3_000_000.0));
        assert_eq!(fetched.status, status::DRAFT, "editing must not touch status");
    }

    #[test]
    fn test_validate_rejects_empty_required_fields() {
        let mut form = NewCase::test_fixture();
        form.category = "".to_string();
        form.description = "   ".to_string();

        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("category"));
        assert!(errors[1].contains("description"));

        assert!(NewCase::test_fixture().validate().is_ok());
    }

    #[test]
    fn test_list_filters() {
        let conn = test_conn();
        let a = Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();
        let mut other = NewCase::test_fixture();
        other.category = "Internal".to_string();
        other.customer_name = "R. Devi".to_string();
        let b = Cases::create(&conn, &other, status::ALLOCATED, "arun").unwrap();

        let by_status = Cases::list(
            &conn,
            &CaseFilter {
                status: Some(status::SUBMITTED.to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].case_id, a.case_id);

        let by_category = Cases::list(
            &conn,
            &CaseFilter {
                category: Some("Internal".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].case_id, b.case_id);

        let by_search = Cases::list(
            &conn,
            &CaseFilter {
                search: Some("Devi".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].case_id, b.case_id);

        let none = Cases::list(
            &conn,
            &CaseFilter {
                created_by: Some("nobody".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_list_allocated_queue() {
        let conn = test_conn();
        let case = Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();
        Cases::update_status(&conn, &case.case_id, status::ALLOCATED, "admin", None).unwrap();
        Allocations::allocate(&conn, &case.case_id, "vinod", "admin", None).unwrap();

        let queue =
            Cases::list_allocated_in_statuses(&conn, "vinod", &[status::ALLOCATED, status::REALLOCATED])
                .unwrap();
        assert_eq!(queue.len(), 1);

        let empty = Cases::list_allocated_in_statuses(&conn, "someone-else", &[status::ALLOCATED])
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_count_by_status() {
        let conn = test_conn();
        Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();
        Cases::create(&conn, &NewCase::test_fixture(), status::SUBMITTED, "maya").unwrap();
        Cases::create(&conn, &NewCase::test_fixture(), status::DRAFT, "maya").unwrap();

        assert_eq!(Cases::count_all(&conn).unwrap(), 3);

        let counts = Cases::count_by_status(&conn).unwrap();
        assert_eq!(counts[0], ("Submitted".to_string(), 2));
        assert_eq!(counts[1], ("Draft".to_string(), 1));
    }

    #[test]
    fn test_recent_ordering() {
        let conn = test_conn();
        Cases::create(&conn, &NewCase::test_fixture(), status::DRAFT, "maya").unwrap();
        let newest = Cases::create(&conn, &NewCase::test_fixture(), status::DRAFT, "maya").unwrap();

        let recent = Cases::recent(&conn, 1).unwrap();
        assert_eq!(recent.len(), 1);
        // Equal created_at seconds are broken by case_id descending
        assert_eq!(recent[0].case_id, newest.case_id);
    }
}
