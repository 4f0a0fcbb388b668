use std::fs;
use std::time::Duration;

use log::{info, warn};
use once_cell::sync::OnceCell;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};

use crate::config::Config;
use crate::error::TathyaError;
use crate::schema::{CREATE_SCHEMA_SQL, MIGRATIONS, SCHEMA_VERSION};
use crate::users::Users;

static POOL: OnceCell<Pool<SqliteConnectionManager>> = OnceCell::new();

pub struct Database;

impl Database {
    /// Opens (creating if needed) the database file, brings the schema up to
    /// the current version, seeds the default admin on an empty user table and
    /// initializes the global connection pool.
    pub fn initialize() -> Result<(), TathyaError> {
        let db_path = Config::get_db_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        {
            let conn = pool.get()?;
            Self::ensure_schema(&conn)?;

            if Users::count(&conn)? == 0 {
                Users::seed_default_admin(&conn)?;
                warn!("No users found - created default admin account 'admin'. Change its password.");
            }
        }

        POOL.set(pool)
            .map_err(|_| TathyaError::Error("Database already initialized".to_string()))?;

        info!("Database ready at {}", db_path.display());
        Ok(())
    }

    /// Checks out a pooled connection. Fails if `initialize` has not run.
    pub fn get_connection() -> Result<PooledConnection<SqliteConnectionManager>, TathyaError> {
        let pool = POOL
            .get()
            .ok_or_else(|| TathyaError::Error("Database not initialized".to_string()))?;
        Ok(pool.get()?)
    }

    /// Runs `f` inside a BEGIN IMMEDIATE transaction, committing on Ok and
    /// rolling back on Err. IMMEDIATE takes the write lock up front so
    /// read-then-write sequences (sequence bump + insert, approval count +
    /// decision) don't interleave between requests.
    pub fn immediate_transaction<T, F>(conn: &Connection, f: F) -> Result<T, TathyaError>
    where
        F: FnOnce(&Connection) -> Result<T, TathyaError>,
    {
        conn.execute_batch("BEGIN IMMEDIATE")?;

        match f(conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                // Preserve the original error even if rollback itself fails
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    warn!("Transaction rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Creates the schema on a fresh database, or applies pending migrations
    /// to an existing one.
    pub fn ensure_schema(conn: &Connection) -> Result<(), TathyaError> {
        let meta_exists: bool = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
                [],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false);

        if !meta_exists {
            info!("Creating schema at version {}", SCHEMA_VERSION);
            conn.execute_batch(CREATE_SCHEMA_SQL)?;
            return Ok(());
        }

        let stored: u32 = Self::schema_version_on(conn)?
            .parse()
            .map_err(|_| TathyaError::Error("Schema version is not a number".to_string()))?;

        if stored == SCHEMA_VERSION {
            return Ok(());
        }
        if stored > SCHEMA_VERSION {
            return Err(TathyaError::Error(format!(
                "Database schema version {} is newer than this binary supports ({})",
                stored, SCHEMA_VERSION
            )));
        }
        if stored == 0 {
            return Err(TathyaError::Error("Schema version 0 is invalid".to_string()));
        }

        // MIGRATIONS[i] upgrades version i+1 to i+2
        for (idx, migration) in MIGRATIONS.iter().enumerate().skip(stored as usize - 1) {
            let from = idx as u32 + 1;
            info!("Upgrading schema from version {} to {}", from, from + 1);

            if let Some(sql) = migration.pre_sql {
                conn.execute_batch(sql)?;
            }
            if let Some(code_fn) = migration.code_fn {
                code_fn(conn)?;
            }
            if let Some(sql) = migration.post_sql {
                conn.execute_batch(sql)?;
            }
        }

        Ok(())
    }

    fn schema_version_on(conn: &Connection) -> Result<String, TathyaError> {
        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        version.ok_or_else(|| TathyaError::Error("Schema version missing".to_string()))
    }

    pub fn get_schema_version() -> Result<String, TathyaError> {
        let conn = Self::get_connection()?;
        Self::schema_version_on(&conn)
    }

    /// In-memory connection with pragmas and schema applied, for unit tests.
    #[cfg(test)]
    pub fn test_connection() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory database");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable foreign keys");
        Self::ensure_schema(&conn).expect("create schema");
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_ensure_schema_creates_fresh_database() {
        let conn = fresh_conn();
        Database::ensure_schema(&conn).unwrap();

        assert_eq!(Database::schema_version_on(&conn).unwrap(), SCHEMA_VERSION.to_string());

        // Spot-check a few tables
        for table in ["cases", "users", "audit_log", "case_approvals"] {
            let count: i32 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} missing", table);
        }
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = fresh_conn();
        Database::ensure_schema(&conn).unwrap();
        Database::ensure_schema(&conn).unwrap();
        assert_eq!(Database::schema_version_on(&conn).unwrap(), SCHEMA_VERSION.to_string());
    }

    #[test]
    fn test_migration_from_v1_adds_columns() {
        let conn = fresh_conn();
        Database::ensure_schema(&conn).unwrap();

        // Rewind the database to version 1 by dropping the v2 columns
        conn.execute_batch(
            r#"
            ALTER TABLE users DROP COLUMN last_login_at;
            ALTER TABLE case_documents DROP COLUMN sha256;
            UPDATE meta SET value = '1' WHERE key = 'schema_version';
            "#,
        )
        .unwrap();

        Database::ensure_schema(&conn).unwrap();

        assert_eq!(Database::schema_version_on(&conn).unwrap(), "2");
        // Columns are back
        conn.query_row("SELECT last_login_at FROM users LIMIT 1", [], |_| Ok(()))
            .optional()
            .unwrap();
        conn.query_row("SELECT sha256 FROM case_documents LIMIT 1", [], |_| Ok(()))
            .optional()
            .unwrap();
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = fresh_conn();
        Database::ensure_schema(&conn).unwrap();
        conn.execute("UPDATE meta SET value = '99' WHERE key = 'schema_version'", [])
            .unwrap();

        let result = Database::ensure_schema(&conn);
        assert!(result.is_err());
    }

    #[test]
    fn test_immediate_transaction_commits_and_rolls_back() {
        let conn = fresh_conn();
        Database::ensure_schema(&conn).unwrap();

        Database::immediate_transaction(&conn, |c| {
            c.execute(
                "INSERT INTO audit_log (case_id, action, performed_by, performed_at) VALUES ('-', 'Test', 'tester', 0)",
                [],
            )
            .map_err(TathyaError::DatabaseError)?;
            Ok(())
        })
        .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let result: Result<(), TathyaError> = Database::immediate_transaction(&conn, |c| {
            c.execute(
                "INSERT INTO audit_log (case_id, action, performed_by, performed_at) VALUES ('-', 'Test2', 'tester', 0)",
                [],
            )
            .map_err(TathyaError::DatabaseError)?;
            Err(TathyaError::Error("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1, "rolled-back insert must not persist");
    }
}
