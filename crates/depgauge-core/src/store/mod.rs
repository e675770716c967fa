//! Repository Store
//!
//! The persisted store is the only shared mutable resource of the pipeline.
//! Writes are per-record upserts keyed by the stable identifier, so writers
//! on different records never conflict.
//!
//! - [`SqliteStore`]: rusqlite-backed store used by the CLI
//! - [`MemoryStore`]: in-process store for tests and dry runs

mod memory;
pub mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::record::{RepositoryRecord, SizeField};

/// Errors raised by a repository store.
///
/// A lookup miss is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    /// Update or size write addressed a record that does not exist
    #[error("Repository {id} not found")]
    RecordNotFound { id: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn record_not_found(id: i64) -> Self {
        Self::RecordNotFound { id }
    }
}

/// Persisted set of repository records.
///
/// Implementations must be safe to share between worker tasks.
pub trait RepositoryStore: Send + Sync {
    /// Look up a record by its unique name.
    ///
    /// When duplicates exist, the one with the lowest id is returned.
    fn find_by_name(&self, name: &str) -> Result<Option<RepositoryRecord>, StoreError>;

    /// Look up a record by identifier.
    fn find_by_id(&self, id: i64) -> Result<Option<RepositoryRecord>, StoreError>;

    /// All live records in id order.
    fn all(&self) -> Result<Vec<RepositoryRecord>, StoreError>;

    /// Insert a record and return its assigned identifier.
    ///
    /// The `id` field of `record` is ignored.
    fn insert(&self, record: &RepositoryRecord) -> Result<i64, StoreError>;

    /// Merge the non-empty fields of `patch` into the record with `patch.id`.
    ///
    /// Returns the record as stored after the merge.
    fn update(&self, patch: &RepositoryRecord) -> Result<RepositoryRecord, StoreError>;

    /// Delete a record. Returns whether a row was removed.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Explicitly clear a size field so the next run measures it again.
    fn clear_size(&self, id: i64, field: SizeField) -> Result<(), StoreError>;

    /// Record a measurement for one size field.
    fn set_size(&self, id: i64, field: SizeField, lines: u64) -> Result<(), StoreError> {
        let mut patch = RepositoryRecord::patch(id);
        patch.set_size(field, lines);
        self.update(&patch).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the trait is object-safe
    fn _assert_object_safe(_: &dyn RepositoryStore) {}

    #[test]
    fn test_error_display() {
        let err = StoreError::record_not_found(42);
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("not found"));
    }
}
