//! SQLite Repository Store
//!
//! Wraps a single rusqlite connection behind a mutex. Update-by-merge reads
//! the row, merges in memory and writes it back while holding the lock, so
//! concurrent writers on the same record never interleave.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use tracing::debug;

use super::schema::{
    REPOSITORY_COLUMNS, SCHEMA_CREATE_INDEXES, SCHEMA_CREATE_METADATA,
    SCHEMA_CREATE_REPOSITORIES, STORE_SCHEMA_VERSION,
};
use super::{RepositoryStore, StoreError};
use crate::record::{RepositoryRecord, SizeField};

/// Repository store backed by a SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        Self::configure_connection(&conn)?;

        conn.execute(SCHEMA_CREATE_REPOSITORIES, [])?;
        conn.execute(SCHEMA_CREATE_METADATA, [])?;
        conn.execute_batch(SCHEMA_CREATE_INDEXES)?;

        let found: Option<String> = conn
            .query_row(
                "SELECT value FROM store_metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match found {
            Some(version) if version != STORE_SCHEMA_VERSION => {
                return Err(StoreError::SchemaVersionMismatch {
                    expected: STORE_SCHEMA_VERSION.to_string(),
                    found: version,
                });
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO store_metadata (key, value) VALUES ('schema_version', ?1)",
                    [STORE_SCHEMA_VERSION],
                )?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure_connection(conn: &Connection) -> SqliteResult<()> {
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> SqliteResult<RepositoryRecord> {
        Ok(RepositoryRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            repository_type: row.get(3)?,
            open_issue_count: row.get(4)?,
            closed_issue_count: row.get(5)?,
            commit_count: row.get(6)?,
            stargazer_count: row.get(7)?,
            creation_date: row.get(8)?,
            license_info: row.get(9)?,
            latest_release: row.get(10)?,
            primary_language: row.get(11)?,
            language_bytes: row.get(12)?,
            original_codebase_size: row.get(13)?,
            library_codebase_size: row.get(14)?,
        })
    }

    fn select_by_id(conn: &Connection, id: i64) -> Result<Option<RepositoryRecord>, StoreError> {
        let sql = format!("SELECT {} FROM repositories WHERE id = ?1", REPOSITORY_COLUMNS);
        Ok(conn
            .query_row(&sql, [id], Self::row_to_record)
            .optional()?)
    }

    fn write_row(conn: &Connection, record: &RepositoryRecord) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE repositories SET
                name = ?2, url = ?3, repository_type = ?4,
                open_issue_count = ?5, closed_issue_count = ?6, commit_count = ?7,
                stargazer_count = ?8, creation_date = ?9, license_info = ?10,
                latest_release = ?11, primary_language = ?12, language_bytes = ?13,
                original_codebase_size = ?14, library_codebase_size = ?15
             WHERE id = ?1",
            params![
                record.id,
                record.name,
                record.url,
                record.repository_type,
                record.open_issue_count,
                record.closed_issue_count,
                record.commit_count,
                record.stargazer_count,
                record.creation_date,
                record.license_info,
                record.latest_release,
                record.primary_language,
                record.language_bytes,
                record.original_codebase_size,
                record.library_codebase_size,
            ],
        )?;
        Ok(())
    }
}

impl RepositoryStore for SqliteStore {
    fn find_by_name(&self, name: &str) -> Result<Option<RepositoryRecord>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM repositories WHERE name = ?1 ORDER BY id LIMIT 1",
            REPOSITORY_COLUMNS
        );
        Ok(conn
            .query_row(&sql, [name], Self::row_to_record)
            .optional()?)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<RepositoryRecord>, StoreError> {
        let conn = self.conn.lock();
        Self::select_by_id(&conn, id)
    }

    fn all(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM repositories ORDER BY id", REPOSITORY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    fn insert(&self, record: &RepositoryRecord) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO repositories (name, url, repository_type) VALUES (?1, ?2, ?3)",
            params![record.name, record.url, record.repository_type],
        )?;
        let id = conn.last_insert_rowid();

        // Remaining columns go through the regular row writer
        Self::write_row(&conn, &RepositoryRecord { id, ..record.clone() })?;
        debug!(id, name = %record.name, "inserted repository");
        Ok(id)
    }

    fn update(&self, patch: &RepositoryRecord) -> Result<RepositoryRecord, StoreError> {
        let conn = self.conn.lock();
        let mut record = Self::select_by_id(&conn, patch.id)?
            .ok_or_else(|| StoreError::record_not_found(patch.id))?;
        record.merge(patch);
        Self::write_row(&conn, &record)?;
        Ok(record)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM repositories WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    fn clear_size(&self, id: i64, field: SizeField) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let sql = format!("UPDATE repositories SET {} = '' WHERE id = ?1", field.column());
        let changed = conn.execute(&sql, [id])?;
        if changed == 0 {
            return Err(StoreError::record_not_found(id));
        }
        Ok(())
    }
}
