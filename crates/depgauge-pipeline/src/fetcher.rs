//! Metadata Enrichment
//!
//! Issues one metadata query per record, at most `concurrency` at a time, and
//! merges the response into the record by id. A failed query leaves its
//! record untouched and is reported; it never aborts the batch.

use std::sync::Arc;

use async_trait::async_trait;
use depgauge_core::{
    RepositoryCoordinates, RepositoryRecord, RepositoryStore, REPOSITORY_TYPE_PRIMARY,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Metadata returned for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryMetadata {
    pub commit_count: Option<u64>,
    pub open_issue_count: u64,
    pub closed_issue_count: u64,
    pub language_bytes: Option<u64>,
    pub stargazer_count: u64,
    pub creation_date: String,
    pub license_key: Option<String>,
    pub latest_release: Option<String>,
    pub primary_language: Option<String>,
}

impl RepositoryMetadata {
    /// Patch addressed at `id` carrying the metadata fields.
    ///
    /// Absent values stay empty so they never clear stored data.
    pub fn to_patch(&self, id: i64) -> RepositoryRecord {
        let mut patch = RepositoryRecord::patch(id);
        patch.repository_type = REPOSITORY_TYPE_PRIMARY.to_string();
        patch.commit_count = self.commit_count.map(|c| c.to_string()).unwrap_or_default();
        patch.open_issue_count = self.open_issue_count.to_string();
        patch.closed_issue_count = self.closed_issue_count.to_string();
        patch.language_bytes = self
            .language_bytes
            .map(|b| b.to_string())
            .unwrap_or_default();
        patch.stargazer_count = self.stargazer_count.to_string();
        patch.creation_date = self.creation_date.clone();
        patch.license_info = self.license_key.clone().unwrap_or_default();
        patch.latest_release = self.latest_release.clone().unwrap_or_default();
        patch.primary_language = self.primary_language.clone().unwrap_or_default();
        patch
    }
}

/// A service that answers metadata queries.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, coords: &RepositoryCoordinates) -> Result<RepositoryMetadata>;
}

/// A record whose metadata could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    pub id: i64,
    pub name: String,
    pub error: String,
}

/// Outcome of one enrichment batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Records merged successfully
    pub enriched: usize,
    /// Records whose URL has no owner/name
    pub skipped: Vec<String>,
    pub failed: Vec<FailedRecord>,
}

/// Bounded-concurrency metadata enrichment.
pub struct MetadataFetcher {
    source: Arc<dyn MetadataSource>,
    concurrency: usize,
}

impl MetadataFetcher {
    pub fn new(source: Arc<dyn MetadataSource>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Enrich every record in the store.
    ///
    /// Returns once every query has finished and every slot is released.
    pub async fn enrich(&self, store: &dyn RepositoryStore) -> Result<EnrichmentReport> {
        let records = store.all()?;
        let mut report = EnrichmentReport::default();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        info!(
            records = records.len(),
            concurrency = self.concurrency,
            "Enriching repository metadata"
        );

        for record in records {
            let Some(coords) = record.coordinates() else {
                debug!(name = %record.name, url = %record.url, "No owner/name in URL, skipping");
                report.skipped.push(record.name);
                continue;
            };

            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => source.fetch(&coords).await,
                    Err(_) => Err(PipelineError::Cancelled),
                };
                (record.id, record.name, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (id, name, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Metadata task failed: {}", e);
                    report.failed.push(FailedRecord {
                        id: 0,
                        name: String::new(),
                        error: PipelineError::join(e).to_string(),
                    });
                    continue;
                }
            };

            match result {
                Ok(metadata) => {
                    store.update(&metadata.to_patch(id))?;
                    debug!(id, name = %name, "Merged metadata");
                    report.enriched += 1;
                }
                Err(e) => {
                    warn!(id, name = %name, "Metadata query failed: {}", e);
                    report.failed.push(FailedRecord {
                        id,
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            enriched = report.enriched,
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Metadata enrichment complete"
        );
        Ok(report)
    }
}
