//! facewatch-store — SQLite persistence for enrolled identities.
//!
//! Each row holds the identity fields, the path of the retained source
//! image and the descriptor serialized as a JSON array of floats. The
//! descriptor column is written once at enrollment and never updated.

use facewatch_core::{Descriptor, DescriptorError, EnrollmentRecord, Identity};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    surname     TEXT NOT NULL,
    code        TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    flagged     INTEGER NOT NULL DEFAULT 0,
    image_path  TEXT NOT NULL,
    descriptor  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);";

const RECORD_COLUMNS: &str =
    "id, name, surname, code, email, flagged, image_path, created_at, updated_at";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(i64),
    #[error("a record with code {0:?} already exists")]
    DuplicateCode(String),
    #[error("creating database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// An enrolled record together with its descriptor as stored on disk.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub record: EnrollmentRecord,
    pub raw_descriptor: String,
}

impl StoredRecord {
    /// Parse the stored descriptor.
    pub fn descriptor(&self) -> Result<Descriptor, DescriptorError> {
        Descriptor::from_json(&self.raw_descriptor)
    }
}

/// Decode a full scan into matcher candidates.
///
/// Rows whose descriptor does not parse are skipped with a warning; a single
/// corrupt row never fails the whole scan.
pub fn decode_candidates(rows: Vec<StoredRecord>) -> Vec<(EnrollmentRecord, Descriptor)> {
    rows.into_iter()
        .filter_map(|row| match row.descriptor() {
            Ok(descriptor) => Some((row.record, descriptor)),
            Err(e) => {
                tracing::warn!(id = row.record.id, error = %e, "skipping record with malformed descriptor");
                None
            }
        })
        .collect()
}

/// SQLite-backed record store.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened record store");
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Enroll a new person.
    pub fn insert(
        &self,
        identity: &Identity,
        image_path: &str,
        descriptor: &Descriptor,
    ) -> Result<EnrollmentRecord, StoreError> {
        let raw_descriptor = descriptor.to_json()?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO records
                    (name, surname, code, email, flagged, image_path, descriptor, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    identity.name,
                    identity.surname,
                    identity.code,
                    identity.email,
                    identity.flagged,
                    image_path,
                    raw_descriptor,
                    now,
                ],
            )
            .map_err(|e| map_unique(e, &identity.code))?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(id, code = %identity.code, flagged = identity.flagged, "record inserted");

        Ok(EnrollmentRecord {
            id,
            identity: identity.clone(),
            image_path: image_path.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Replace the identity fields of an existing record. The descriptor and
    /// source image are left untouched.
    pub fn update(&self, id: i64, identity: &Identity) -> Result<EnrollmentRecord, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE records
                 SET name = ?1, surname = ?2, code = ?3, email = ?4, flagged = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    identity.name,
                    identity.surname,
                    identity.code,
                    identity.email,
                    identity.flagged,
                    now,
                    id,
                ],
            )
            .map_err(|e| map_unique(e, &identity.code))?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::info!(id, code = %identity.code, "record updated");

        self.get(id)?.ok_or(StoreError::NotFound(id))
    }

    /// Delete a record by id.
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        tracing::info!(id, "record deleted");
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<EnrollmentRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], record_from_row)
            .optional()?)
    }

    /// All records in enrollment order, without descriptors.
    pub fn list(&self) -> Result<Vec<EnrollmentRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Snapshot of every record with its raw descriptor, in enrollment order.
    pub fn scan(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS}, descriptor FROM records ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredRecord {
                    record: record_from_row(row)?,
                    raw_descriptor: row.get("descriptor")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(count = rows.len(), "scanned record store");
        Ok(rows)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<EnrollmentRecord> {
    Ok(EnrollmentRecord {
        id: row.get("id")?,
        identity: Identity {
            name: row.get("name")?,
            surname: row.get("surname")?,
            code: row.get("code")?,
            email: row.get("email")?,
            flagged: row.get("flagged")?,
        },
        image_path: row.get("image_path")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_unique(err: rusqlite::Error, code: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE => {
            StoreError::DuplicateCode(code.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}
