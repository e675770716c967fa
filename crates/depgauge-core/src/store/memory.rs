//! In-memory repository store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{RepositoryStore, StoreError};
use crate::record::{RepositoryRecord, SizeField};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<i64, RepositoryRecord>,
}

/// Repository store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records` (ids are reassigned).
    pub fn with_records(records: impl IntoIterator<Item = RepositoryRecord>) -> Self {
        let store = Self::new();
        for record in records {
            let mut inner = store.inner.write();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.records.insert(id, RepositoryRecord { id, ..record });
        }
        store
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RepositoryStore for MemoryStore {
    fn find_by_name(&self, name: &str) -> Result<Option<RepositoryRecord>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.records.values().find(|r| r.name == name).cloned())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<RepositoryRecord>, StoreError> {
        Ok(self.inner.read().records.get(&id).cloned())
    }

    fn all(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        Ok(self.inner.read().records.values().cloned().collect())
    }

    fn insert(&self, record: &RepositoryRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(
            id,
            RepositoryRecord {
                id,
                ..record.clone()
            },
        );
        Ok(id)
    }

    fn update(&self, patch: &RepositoryRecord) -> Result<RepositoryRecord, StoreError> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .get_mut(&patch.id)
            .ok_or_else(|| StoreError::record_not_found(patch.id))?;
        record.merge(patch);
        Ok(record.clone())
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().records.remove(&id).is_some())
    }

    fn clear_size(&self, id: i64, field: SizeField) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::record_not_found(id))?;
        match field {
            SizeField::Original => record.original_codebase_size.clear(),
            SizeField::Library => record.library_codebase_size.clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_records_assigns_ids() {
        let store = MemoryStore::with_records(vec![
            RepositoryRecord::new("a/one", "github.com/a/one"),
            RepositoryRecord::new("a/two", "github.com/a/two"),
        ]);
        let all = store.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 1);
        assert_eq!(all[1].id, 2);
    }

    #[test]
    fn test_update_missing_record() {
        let store = MemoryStore::new();
        let result = store.update(&RepositoryRecord::patch(5));
        assert!(matches!(result, Err(StoreError::RecordNotFound { id: 5 })));
    }
}
