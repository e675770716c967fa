//! Repository discovery and the record-name dedup pass.

use async_trait::async_trait;
use depgauge_core::{partition_duplicates, RepositoryRecord, RepositoryStore};
use tracing::{debug, info, warn};

use crate::error::Result;

/// A service that lists candidate repositories.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Up to `count` repository URLs such as `github.com/owner/repo`.
    async fn discover(&self, count: usize) -> Result<Vec<String>>;
}

/// Outcome of one discovery call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Names of newly inserted records
    pub inserted: Vec<String>,
    /// Results already present in the store
    pub existing: usize,
    /// Results that are not `github.com/owner/repo`
    pub invalid: Vec<String>,
}

/// Insert every discovered repository not already in the store.
pub async fn discover_repositories(
    store: &dyn RepositoryStore,
    source: &dyn DiscoverySource,
    count: usize,
) -> Result<DiscoveryReport> {
    let urls = source.discover(count).await?;
    let mut report = DiscoveryReport::default();

    info!(results = urls.len(), "Discovered repositories");

    for url in urls {
        let Some(record) = RepositoryRecord::from_discovered(&url) else {
            debug!(url = %url, "Not a GitHub repository, skipping");
            report.invalid.push(url);
            continue;
        };

        if store.find_by_name(&record.name)?.is_some() {
            report.existing += 1;
            continue;
        }

        let id = store.insert(&record)?;
        debug!(id, name = %record.name, "Inserted repository");
        report.inserted.push(record.name);
    }

    info!(
        inserted = report.inserted.len(),
        existing = report.existing,
        invalid = report.invalid.len(),
        "Discovery complete"
    );
    Ok(report)
}

/// Delete every record whose name repeats an earlier one.
///
/// The record with the lowest id survives. Returns the number deleted.
pub fn remove_duplicates(store: &dyn RepositoryStore) -> Result<usize> {
    let mut records = store.all()?;
    records.sort_by_key(|r| r.id);

    let (_, duplicates) = partition_duplicates(records, |r| r.name.clone());

    let mut deleted = 0;
    for duplicate in duplicates {
        if store.delete(duplicate.id)? {
            deleted += 1;
        } else {
            warn!(id = duplicate.id, "Duplicate vanished before delete");
        }
    }

    if deleted > 0 {
        info!(deleted, "Removed duplicate repositories");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use depgauge_core::MemoryStore;
    use pretty_assertions::assert_eq;

    // Test that the trait is object-safe
    fn _assert_object_safe(_: &dyn DiscoverySource) {}

    struct FixedSource(Vec<&'static str>);

    #[async_trait]
    impl DiscoverySource for FixedSource {
        async fn discover(&self, count: usize) -> Result<Vec<String>> {
            Ok(self.0.iter().take(count).map(|s| s.to_string()).collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DiscoverySource for FailingSource {
        async fn discover(&self, _count: usize) -> Result<Vec<String>> {
            Err(PipelineError::transport("http://search", "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_discover_inserts_new_only() {
        let store = MemoryStore::with_records(vec![RepositoryRecord::new(
            "acme/old",
            "github.com/acme/old",
        )]);
        let source = FixedSource(vec![
            "github.com/acme/old",
            "github.com/acme/new",
            "gitlab.com/other/thing",
        ]);

        let report = discover_repositories(&store, &source, 10).await.unwrap();

        assert_eq!(report.inserted, vec!["acme/new".to_string()]);
        assert_eq!(report.existing, 1);
        assert_eq!(report.invalid, vec!["gitlab.com/other/thing".to_string()]);
        assert_eq!(store.len(), 2);

        let new = store.find_by_name("acme/new").unwrap().unwrap();
        assert_eq!(new.url, "github.com/acme/new");
        assert_eq!(new.repository_type, "primary");
    }

    #[tokio::test]
    async fn test_discover_is_idempotent() {
        let store = MemoryStore::new();
        let source = FixedSource(vec!["github.com/acme/a", "github.com/acme/b"]);

        discover_repositories(&store, &source, 10).await.unwrap();
        let second = discover_repositories(&store, &source, 10).await.unwrap();

        assert!(second.inserted.is_empty());
        assert_eq!(second.existing, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_discover_source_failure_propagates() {
        let store = MemoryStore::new();
        let err = discover_repositories(&store, &FailingSource, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_identical_names_one_survives() {
        let store = MemoryStore::with_records(vec![
            RepositoryRecord::new("acme/widget", "github.com/acme/widget"),
            RepositoryRecord::new("acme/other", "github.com/acme/other"),
            RepositoryRecord::new("acme/widget", "github.com/acme/widget"),
        ]);
        let first_id = store.find_by_name("acme/widget").unwrap().unwrap().id;

        let deleted = remove_duplicates(&store).unwrap();

        assert_eq!(deleted, 1);
        let remaining: Vec<_> = store
            .all()
            .unwrap()
            .into_iter()
            .filter(|r| r.name == "acme/widget")
            .collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, first_id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_no_duplicates_deletes_nothing() {
        let store = MemoryStore::with_records(vec![
            RepositoryRecord::new("acme/a", "github.com/acme/a"),
            RepositoryRecord::new("acme/b", "github.com/acme/b"),
        ]);
        assert_eq!(remove_duplicates(&store).unwrap(), 0);
        assert_eq!(store.len(), 2);
    }
}
