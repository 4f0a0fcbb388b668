use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::TathyaError;
use crate::roles::Role;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin@123";

/// An application user. `role` is the flat string stored in the database;
/// use [`User::role_enum`] when a typed role is needed.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub active: bool,
    pub created_at: i64,
    pub last_login_at: Option<i64>,
}

impl User {
    pub fn role_enum(&self) -> Option<Role> {
        Role::from_string(&self.role)
    }
}

pub struct Users;

impl Users {
    /// Hashes a password as `salt$hexdigest` where digest = SHA-256(salt || password).
    /// The salt is a fresh UUID v4 in simple (32 hex chars) form.
    pub fn hash_password(password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = Self::digest_with_salt(&salt, password);
        format!("{}${}", salt, digest)
    }

    /// Verifies a password against a stored `salt$hexdigest` value.
    /// Malformed stored values never verify.
    pub fn verify_password(password: &str, stored: &str) -> bool {
        match stored.split_once('$') {
            Some((salt, digest)) => Self::digest_with_salt(salt, password) == digest,
            None => false,
        }
    }

    fn digest_with_salt(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn create(
        conn: &Connection,
        username: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<User, TathyaError> {
        let now = chrono::Utc::now().timestamp();
        let password_hash = Self::hash_password(password);

        let user_id: i64 = conn
            .query_row(
                "INSERT INTO users (username, password_hash, full_name, role, active, created_at)
                 VALUES (?, ?, ?, ?, 1, ?)
                 RETURNING user_id",
                params![username, password_hash, full_name, role.as_str(), now],
                |row| row.get(0),
            )
            .map_err(TathyaError::DatabaseError)?;

        Ok(User {
            user_id,
            username: username.to_string(),
            password_hash,
            full_name: full_name.to_string(),
            role: role.as_str().to_string(),
            active: true,
            created_at: now,
            last_login_at: None,
        })
    }

    /// Seeds the default admin account. Called once when the user table is empty.
    pub fn seed_default_admin(conn: &Connection) -> Result<(), TathyaError> {
        Self::create(
            conn,
            DEFAULT_ADMIN_USERNAME,
            DEFAULT_ADMIN_PASSWORD,
            "Default Administrator",
            Role::Admin,
        )?;
        Ok(())
    }

    pub fn count(conn: &Connection) -> Result<i64, TathyaError> {
        let count = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(TathyaError::DatabaseError)?;
        Ok(count)
    }

    pub fn get_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, TathyaError> {
        let user = conn
            .query_row(
                "SELECT user_id, username, password_hash, full_name, role, active, created_at, last_login_at
                 FROM users WHERE user_id = ?",
                [user_id],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(user)
    }

    pub fn get_by_username(conn: &Connection, username: &str) -> Result<Option<User>, TathyaError> {
        let user = conn
            .query_row(
                "SELECT user_id, username, password_hash, full_name, role, active, created_at, last_login_at
                 FROM users WHERE username = ?",
                [username],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(user)
    }

    pub fn list(conn: &Connection) -> Result<Vec<User>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT user_id, username, password_hash, full_name, role, active, created_at, last_login_at
             FROM users ORDER BY username",
        )?;

        let users = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(users)
    }

    /// Active users holding the given role, for assignment pickers.
    pub fn list_active_by_role(conn: &Connection, role: Role) -> Result<Vec<User>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT user_id, username, password_hash, full_name, role, active, created_at, last_login_at
             FROM users WHERE role = ? AND active = 1 ORDER BY username",
        )?;

        let users = stmt
            .query_map([role.as_str()], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(users)
    }

    /// Updates profile fields. Returns false if the user does not exist.
    pub fn update(
        conn: &Connection,
        user_id: i64,
        full_name: &str,
        role: Role,
        active: bool,
    ) -> Result<bool, TathyaError> {
        let rows = conn
            .execute(
                "UPDATE users SET full_name = ?, role = ?, active = ? WHERE user_id = ?",
                params![full_name, role.as_str(), active, user_id],
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(rows > 0)
    }

    pub fn set_password(conn: &Connection, user_id: i64, password: &str) -> Result<bool, TathyaError> {
        let rows = conn
            .execute(
                "UPDATE users SET password_hash = ? WHERE user_id = ?",
                params![Self::hash_password(password), user_id],
            )
            .map_err(TathyaError::DatabaseError)?;
        Ok(rows > 0)
    }

    /// Checks credentials for login. Returns the user on success; None for an
    /// unknown username, wrong password or deactivated account. The caller
    /// does not learn which check failed.
    pub fn verify_login(
        conn: &Connection,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, TathyaError> {
        let user = match Self::get_by_username(conn, username)? {
            Some(user) => user,
            None => return Ok(None),
        };

        if !user.active || !Self::verify_password(password, &user.password_hash) {
            return Ok(None);
        }

        Ok(Some(user))
    }

    pub fn record_login(conn: &Connection, user_id: i64) -> Result<(), TathyaError> {
        conn.execute(
            "UPDATE users SET last_login_at = ? WHERE user_id = ?",
            params![chrono::Utc::now().timestamp(), user_id],
        )
        .map_err(TathyaError::DatabaseError)?;
        Ok(())
    }

    fn map_row(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            user_id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            full_name: row.get(3)?,
            role: row.get(4)?,
            active: row.get(5)?,
            created_at: row.get(6)?,
            last_login_at: row.get(7)?,
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
    fn test_password_hash_roundtrip() {
        let stored = Users::hash_password("s3cret!");
        assert!(Users::verify_password("s3cret!", &stored));
        assert!(!Users::verify_password("s3cret", &stored));
        assert!(!Users::verify_password("", &stored));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = Users::hash_password("same-password");
        let b = Users::hash_password("same-password");
        assert_ne!(a, b);
        assert!(Users::verify_password("same-password", &a));
        assert!(Users::verify_password("same-password", &b));
    }

    #[test]
    fn test_malformed_stored_hash_never_verifies() {
        assert!(!Users::verify_password("x", "no-separator-here"));
        assert!(!Users::verify_password("x", ""));
    }

    #[test]
    fn test_create_and_get_roundtrip() {
        let conn = test_conn();
        let created = Users::create(&conn, "rita", "pw", "Rita Iyer", Role::Reviewer).unwrap();

        let fetched = Users::get_by_username(&conn, "rita").unwrap().unwrap();
        assert_eq!(fetched.user_id, created.user_id);
        assert_eq!(fetched.full_name, "Rita Iyer");
        assert_eq!(fetched.role, "Reviewer");
        assert!(fetched.active);
        assert_eq!(fetched.last_login_at, None);
        assert_eq!(fetched.role_enum(), Some(Role::Reviewer));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let conn = test_conn();
        Users::create(&conn, "dup", "pw", "", Role::Initiator).unwrap();
        let result = Users::create(&conn, "dup", "pw2", "", Role::Initiator);
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_login_paths() {
        let conn = test_conn();
        let user = Users::create(&conn, "vinod", "pw", "Vinod", Role::Investigator).unwrap();

        assert!(Users::verify_login(&conn, "vinod", "pw").unwrap().is_some());
        assert!(Users::verify_login(&conn, "vinod", "wrong").unwrap().is_none());
        assert!(Users::verify_login(&conn, "nobody", "pw").unwrap().is_none());

        // Deactivated accounts cannot log in
        Users::update(&conn, user.user_id, "Vinod", Role::Investigator, false).unwrap();
        assert!(Users::verify_login(&conn, "vinod", "pw").unwrap().is_none());
    }

    #[test]
    fn test_list_active_by_role() {
        let conn = test_conn();
        Users::create(&conn, "inv1", "pw", "", Role::Investigator).unwrap();
        let inv2 = Users::create(&conn, "inv2", "pw", "", Role::Investigator).unwrap();
        Users::create(&conn, "rev1", "pw", "", Role::Reviewer).unwrap();
        Users::update(&conn, inv2.user_id, "", Role::Investigator, false).unwrap();

        let investigators = Users::list_active_by_role(&conn, Role::Investigator).unwrap();
        assert_eq!(investigators.len(), 1);
        assert_eq!(investigators[0].username, "inv1");
    }

    #[test]
    fn test_set_password_and_record_login() {
        let conn = test_conn();
        let user = Users::create(&conn, "asha", "old", "", Role::Approver).unwrap();

        assert!(Users::set_password(&conn, user.user_id, "new").unwrap());
        assert!(Users::verify_login(&conn, "asha", "old").unwrap().is_none());
        assert!(Users::verify_login(&conn, "asha", "new").unwrap().is_some());

        Users::record_login(&conn, user.user_id).unwrap();
        let fetched = Users::get_by_id(&conn, user.user_id).unwrap().unwrap();
        assert!(fetched.last_login_at.is_some());
    }

    #[test]
    fn test_seed_default_admin() {
        let conn = test_conn();
        assert_eq!(Users::count(&conn).unwrap(), 0);
        Users::seed_default_admin(&conn).unwrap();

        let admin = Users::verify_login(&conn, DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD)
            .unwrap()
            .unwrap();
        assert_eq!(admin.role_enum(), Some(Role::Admin));
    }
}
