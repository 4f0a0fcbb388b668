mod base;
mod v1_to_v2;

use crate::error::TathyaError;
use rusqlite::Connection;

/// Function type for migration code that transforms data during schema upgrades.
pub type MigrationFn = fn(&Connection) -> Result<(), TathyaError>;

pub use base::CREATE_SCHEMA_SQL;
use v1_to_v2::UPGRADE_1_TO_2_SQL;

/// Current schema version, matching the version written by CREATE_SCHEMA_SQL.
pub const SCHEMA_VERSION: u32 = 2;

/// Migration descriptor supporting 3-phase migrations:
/// - pre_sql: SQL batch to run before Rust code (optional)
/// - code_fn: Rust function for complex transformations (optional)
/// - post_sql: SQL batch to run after Rust code (optional)
///
/// For simple SQL-only migrations, only pre_sql is needed.
pub struct Migration {
    pub pre_sql: Option<&'static str>,
    pub code_fn: Option<MigrationFn>,
    pub post_sql: Option<&'static str>,
}

impl Migration {
    /// Create a SQL-only migration (no Rust code needed)
    pub const fn sql_only(sql: &'static str) -> Self {
        Self {
            pre_sql: Some(sql),
            code_fn: None,
            post_sql: None,
        }
    }
}

pub const MIGRATION_1_TO_2: Migration = Migration::sql_only(UPGRADE_1_TO_2_SQL);

/// Migrations in order; index 0 upgrades version 1 to version 2.
pub const MIGRATIONS: [&Migration; 1] = [&MIGRATION_1_TO_2];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_chain_is_contiguous() {
        // One migration per version step below the current version
        assert_eq!(MIGRATIONS.len() as u32, SCHEMA_VERSION - 1);
    }

    #[test]
    fn test_base_schema_declares_current_version() {
        let marker = format!("('schema_version', '{}')", SCHEMA_VERSION);
        assert!(
            CREATE_SCHEMA_SQL.contains(&marker),
            "base schema must write schema_version {}",
            SCHEMA_VERSION
        );
    }
}
