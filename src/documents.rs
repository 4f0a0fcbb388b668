use std::fs;
use std::path::Path;

use hex::encode;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::TathyaError;

#[derive(Debug, Clone, Serialize)]
pub struct CaseDocument {
    pub document_id: i64,
    pub case_id: String,
    pub file_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_by: String,
    pub uploaded_at: i64,
}

/// Uploaded evidence files. Bytes live on disk under the uploads directory
/// with a generated name; the table keeps the original name and a checksum.
pub struct Documents;

impl Documents {
    /// Writes the bytes to disk and records the row. The on-disk name is a
    /// fresh uuid with the original extension, so client file names never
    /// touch the filesystem path.
    pub fn store(
        conn: &Connection,
        uploads_dir: &Path,
        case_id: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        uploaded_by: &str,
    ) -> Result<CaseDocument, TathyaError> {
        let stored_name = match Path::new(file_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4().simple(), ext),
            None => Uuid::new_v4().simple().to_string(),
        };
        let sha256 = encode(Sha256::digest(data));
        let now = chrono::Utc::now().timestamp();

        fs::create_dir_all(uploads_dir)?;
        let disk_path = uploads_dir.join(&stored_name);
        fs::write(&disk_path, data)?;

        let inserted = conn.query_row(
            "INSERT INTO case_documents (case_id, file_name, stored_name, content_type, size_bytes, sha256, uploaded_by, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING document_id",
            params![
                case_id,
                file_name,
                stored_name,
                content_type,
                data.len() as i64,
                sha256,
                uploaded_by,
                now
            ],
            |row| row.get::<_, i64>(0),
        );

        let document_id = match inserted {
            Ok(id) => id,
            Err(err) => {
                // Don't leave orphan bytes behind when the row insert fails
                let _ = fs::remove_file(&disk_path);
                return Err(TathyaError::DatabaseError(err));
            }
        };

        Ok(CaseDocument {
            document_id,
            case_id: case_id.to_string(),
            file_name: file_name.to_string(),
            stored_name,
            content_type: content_type.to_string(),
            size_bytes: data.len() as i64,
            sha256,
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: now,
        })
    }

    pub fn get_by_id(
        conn: &Connection,
        document_id: i64,
    ) -> Result<Option<CaseDocument>, TathyaError> {
        let document = conn
            .query_row(
                "SELECT document_id, case_id, file_name, stored_name, content_type, size_bytes, sha256, uploaded_by, uploaded_at
                 FROM case_documents WHERE document_id = ?",
                [document_id],
                Self::map_row,
            )
            .optional()
            .map_err(TathyaError::DatabaseError)?;
        Ok(document)
    }

    pub fn list_for_case(
        conn: &Connection,
        case_id: &str,
    ) -> Result<Vec<CaseDocument>, TathyaError> {
        let mut stmt = conn.prepare(
            "SELECT document_id, case_id, file_name, stored_name, content_type, size_bytes, sha256, uploaded_by, uploaded_at
             FROM case_documents WHERE case_id = ? ORDER BY document_id",
        )?;

        let documents = stmt
            .query_map([case_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(TathyaError::DatabaseError)?;
        Ok(documents)
    }

    /// Reads a stored document's bytes back for download.
    pub fn read_bytes(uploads_dir: &Path, stored_name: &str) -> Result<Vec<u8>, TathyaError> {
        Ok(fs::read(uploads_dir.join(stored_name))?)
    }

    fn map_row(row: &Row) -> rusqlite::Result<CaseDocument> {
        Ok(CaseDocument {
            document_id: row.get(0)?,
            case_id: row.get(1)?,
            file_name: row.get(2)?,
            stored_name: row.get(3)?,
            content_type: row.get(4)?,
            size_bytes: row.get(5)?,
            sha256: row.get(6)?,
            uploaded_by: row.get(7)?,
            uploaded_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{Cases, NewCase};
    use crate::db::Database;
    use crate::status;
    use tempfile::tempdir;

    fn setup() -> (Connection, String) {
        let conn = Database::test_connection();
        let case_id = Cases::create(&conn, &NewCase::test_fixture(), status::UNDER_INVESTIGATION, "vinod")
            .unwrap()
            .case_id;
        (conn, case_id)
    }

    #[test]
    fn test_store_and_read_back() {
        let (conn, case_id) = setup();
        let dir = tempdir().unwrap();
        let data = b"PDF-ish bytes";

        let doc = Documents::store(
            &conn,
            dir.path(),
            &case_id,
            "site_visit.pdf",
            "application/pdf",
            data,
            "vinod",
        )
        .unwrap();

        assert_eq!(doc.file_name, "site_visit.pdf");
        assert!(doc.stored_name.ends_with(".pdf"));
        assert_ne!(doc.stored_name, doc.file_name);
        assert_eq!(doc.size_bytes, data.len() as i64);
        assert_eq!(doc.sha256, encode(Sha256::digest(data)));

        let read = Documents::read_bytes(dir.path(), &doc.stored_name).unwrap();
        assert_eq!(read, data);

        let stored = Documents::get_by_id(&conn, doc.document_id).unwrap().unwrap();
        assert_eq!(stored.sha256, doc.sha256);
    }

    #[test]
    fn test_store_without_extension() {
        let (conn, case_id) = setup();
        let dir = tempdir().unwrap();

        let doc = Documents::store(&conn, dir.path(), &case_id, "README", "text/plain", b"notes", "vinod")
            .unwrap();
        assert!(!doc.stored_name.contains('.'));
        assert!(dir.path().join(&doc.stored_name).exists());
    }

    #[test]
    fn test_failed_insert_removes_file() {
        let (conn, _case_id) = setup();
        let dir = tempdir().unwrap();

        // Unknown case violates the foreign key, after the bytes hit disk
        let result = Documents::store(
            &conn,
            dir.path(),
            "CASE-000000-99999",
            "evidence.jpg",
            "image/jpeg",
            b"bytes",
            "vinod",
        );
        assert!(result.is_err());

        let leftover = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftover, 0, "orphan upload must be cleaned up");
    }

    #[test]
    fn test_list_for_case() {
        let (conn, case_id) = setup();
        let dir = tempdir().unwrap();

        Documents::store(&conn, dir.path(), &case_id, "a.pdf", "application/pdf", b"a", "vinod").unwrap();
        Documents::store(&conn, dir.path(), &case_id, "b.png", "image/png", b"b", "vinod").unwrap();

        let docs = Documents::list_for_case(&conn, &case_id).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].file_name, "a.pdf");
        assert_eq!(docs[1].file_name, "b.png");

        assert!(Documents::get_by_id(&conn, 9999).unwrap().is_none());
    }
}
