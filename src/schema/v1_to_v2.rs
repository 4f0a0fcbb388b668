pub const UPGRADE_1_TO_2_SQL: &str = r#"
--
-- Schema Upgrade: Version 1 → 2
--
-- Adds the columns introduced after the first deployment:
-- - users.last_login_at: login bookkeeping shown on the admin user list
-- - case_documents.sha256: upload integrity checksum
--
-- Plain column additions; existing document rows get an empty checksum,
-- meaning "not recorded".
--

BEGIN TRANSACTION;

-- Verify schema version is exactly 1
SELECT 1 / (CASE WHEN (SELECT value FROM meta WHERE key = 'schema_version') = '1' THEN 1 ELSE 0 END);

ALTER TABLE users ADD COLUMN last_login_at INTEGER DEFAULT NULL;

ALTER TABLE case_documents ADD COLUMN sha256 TEXT NOT NULL DEFAULT '';

INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', '2');

COMMIT;
"#;
