use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::error::{PersistenceError, PersistenceResult};
use super::models::{NewPhoto, PhotoRecord};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS photos (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        source_path  TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        thumbnail    BLOB NOT NULL,
        metadata     BLOB,
        ingested_at  INTEGER NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_photos_content_hash ON photos(content_hash);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, source_path, content_hash, thumbnail, metadata, ingested_at FROM photos";

/// Keyed, durable storage of photo records.
///
/// Implementations must enforce that at most one record exists per
/// content hash, rejecting a second insert with
/// [`PersistenceError::Duplicate`].
pub trait RecordStore: Send + Sync {
    /// Look up the record holding `hash`
    fn get_by_hash(&self, hash: &str) -> PersistenceResult<Option<PhotoRecord>>;

    fn exists_by_hash(&self, hash: &str) -> PersistenceResult<bool> {
        Ok(self.get_by_hash(hash)?.is_some())
    }

    /// Insert a record and return its assigned id
    fn insert(&self, photo: &NewPhoto) -> PersistenceResult<i64>;

    fn get_by_id(&self, id: i64) -> PersistenceResult<Option<PhotoRecord>>;

    /// Records newest first, optionally capped at `limit`
    fn list(&self, limit: Option<usize>) -> PersistenceResult<Vec<PhotoRecord>>;

    /// Overwrite the record with `record.id`; false if no such record
    fn update(&self, record: &PhotoRecord) -> PersistenceResult<bool>;

    /// Remove a record; false if no such record
    fn delete(&self, id: i64) -> PersistenceResult<bool>;

    fn count(&self) -> PersistenceResult<u64>;
}

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (creating if necessary) the database at `path`
    pub fn open(path: &Path) -> PersistenceResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistenceError::Initialization(format!(
                        "Cannot create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!("SQLite journal mode: {}", journal_mode);

        let store = Self::initialize(conn, Some(path.to_path_buf()))?;
        info!("Record store opened at {}", path.display());
        Ok(store)
    }

    /// A throwaway store, used by tests and dry runs
    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::initialize(Connection::open_in_memory()?, None)
    }

    fn initialize(conn: Connection, path: Option<PathBuf>) -> PersistenceResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| PersistenceError::Initialization(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Other("Connection lock poisoned".to_string()))
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PhotoRecord> {
    Ok(PhotoRecord {
        id: row.get(0)?,
        source_path: PathBuf::from(row.get::<_, String>(1)?),
        content_hash: row.get(2)?,
        thumbnail: row.get(3)?,
        metadata: row.get(4)?,
        ingested_at: row.get(5)?,
    })
}

impl RecordStore for SqliteStore {
    fn get_by_hash(&self, hash: &str) -> PersistenceResult<Option<PhotoRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("{} WHERE content_hash = ?1", SELECT_COLUMNS),
                params![hash],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn exists_by_hash(&self, hash: &str) -> PersistenceResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM photos WHERE content_hash = ?1",
                params![hash],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, photo: &NewPhoto) -> PersistenceResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO photos (source_path, content_hash, thumbnail, metadata, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                photo.source_path.to_string_lossy().into_owned(),
                photo.content_hash,
                photo.thumbnail,
                photo.metadata,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_by_id(&self, id: i64) -> PersistenceResult<Option<PhotoRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self, limit: Option<usize>) -> PersistenceResult<Vec<PhotoRecord>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id DESC LIMIT ?1", SELECT_COLUMNS))?;
        let records = stmt
            .query_map(params![limit], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn update(&self, record: &PhotoRecord) -> PersistenceResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE photos
             SET source_path = ?1, content_hash = ?2, thumbnail = ?3, metadata = ?4
             WHERE id = ?5",
            params![
                record.source_path.to_string_lossy().into_owned(),
                record.content_hash,
                record.thumbnail,
                record.metadata,
                record.id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> PersistenceResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM photos WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn count(&self) -> PersistenceResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
