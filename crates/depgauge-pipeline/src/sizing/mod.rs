//! Codebase Sizing
//!
//! A bounded worker pool that, per [`WorkItem`], materializes the artifact in
//! a unique scratch subdirectory, runs the line counter over it, and removes
//! the subdirectory again on every exit path.
//!
//! Two phases build on the pool:
//! - [`SizeCalculator::size_primary`]: one shallow clone per repository whose
//!   original size is unset; each result is written as soon as it arrives
//! - [`SizeCalculator::size_library`]: every dependency of one repository;
//!   the sum is written once the whole set has finished
//!
//! Items whose size is already recorded are never materialized again.

mod process;

pub use process::{ClocCounter, GitCloneMaterializer, GoModuleMaterializer};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use depgauge_core::{DependencyIdentifier, RepositoryRecord, RepositoryStore, SizeField, WorkItem};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Default upper bound for one materialize + count
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(1800);

// ============================================================================
// Tool seams
// ============================================================================

/// Brings an artifact onto local disk.
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Materialize `location` somewhere under `workdir` and return the
    /// directory to count.
    async fn materialize(&self, location: &str, workdir: &Path) -> Result<PathBuf>;

    /// Make `workdir` removable (e.g. drop read-only caches).
    ///
    /// Runs on every exit path before the directory is deleted.
    async fn release(&self, _workdir: &Path) -> Result<()> {
        Ok(())
    }
}

/// External line-counting oracle.
#[async_trait]
pub trait LineCounter: Send + Sync {
    async fn count(&self, path: &Path) -> Result<u64>;
}

// ============================================================================
// Reports
// ============================================================================

/// A work item that produced no measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub name: String,
    pub error: String,
}

/// Outcome of the primary sizing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizingReport {
    /// Records measured and written
    pub measured: usize,
    /// Records whose size was already set
    pub skipped: usize,
    pub failed: Vec<FailedItem>,
    /// Items never started because of cancellation
    pub cancelled: usize,
}

/// Outcome of sizing one repository's dependency set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOutcome {
    /// Library size was already recorded
    AlreadySized,
    /// Sum written to the record
    Recorded {
        lines: u64,
        measured: usize,
        failed: Vec<FailedItem>,
    },
    /// Every dependency failed; nothing written so a later run retries
    Unmeasured { failed: Vec<FailedItem> },
    /// Cancelled before the set completed; nothing written
    Cancelled,
}

// ============================================================================
// Size Calculator
// ============================================================================

/// Bounded worker pool over one materializer and one line counter.
pub struct SizeCalculator {
    materializer: Arc<dyn Materializer>,
    counter: Arc<dyn LineCounter>,
    scratch_dir: PathBuf,
    workers: usize,
    item_timeout: Duration,
    cancel: CancellationToken,
}

impl SizeCalculator {
    pub fn new(
        materializer: Arc<dyn Materializer>,
        counter: Arc<dyn LineCounter>,
        scratch_dir: impl Into<PathBuf>,
        workers: usize,
    ) -> Self {
        Self {
            materializer,
            counter,
            scratch_dir: scratch_dir.into(),
            workers: workers.max(1),
            item_timeout: DEFAULT_ITEM_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = timeout;
        self
    }

    /// Stop starting new items once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Submit `items` to the pool.
    ///
    /// Drain the returned set to receive `(item, result)` pairs in
    /// completion order.
    pub async fn submit(&self, items: Vec<WorkItem>) -> Result<JoinSet<(WorkItem, Result<u64>)>> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for item in items {
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let materializer = Arc::clone(&self.materializer);
            let counter = Arc::clone(&self.counter);
            let scratch_dir = self.scratch_dir.clone();
            let timeout = self.item_timeout;

            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let result = match permit {
                    Some(_permit) if !cancel.is_cancelled() => {
                        measure(&*materializer, &*counter, &scratch_dir, &item, timeout).await
                    }
                    _ => Err(PipelineError::Cancelled),
                };
                (item, result)
            });
        }

        Ok(tasks)
    }

    /// Measure every record whose original size is unset.
    pub async fn size_primary(&self, store: &dyn RepositoryStore) -> Result<SizingReport> {
        let records = store.all()?;
        let mut report = SizingReport::default();

        let items: Vec<WorkItem> = records
            .into_iter()
            .filter(|r| {
                let sized = r.is_sized(SizeField::Original);
                if sized {
                    report.skipped += 1;
                }
                !sized
            })
            .map(|r| WorkItem::new(r.clone_url(), r.name.clone(), r.id))
            .collect();

        info!(
            pending = items.len(),
            skipped = report.skipped,
            workers = self.workers,
            "Sizing primary repositories"
        );

        let mut tasks = self.submit(items).await?;
        while let Some(joined) = tasks.join_next().await {
            let (item, result) = joined.map_err(PipelineError::join)?;
            match result {
                Ok(lines) => {
                    store.set_size(item.record_id, SizeField::Original, lines)?;
                    info!(name = %item.name, lines, "Recorded original codebase size");
                    report.measured += 1;
                }
                Err(PipelineError::Cancelled) => report.cancelled += 1,
                Err(e) => {
                    warn!(name = %item.name, "Sizing failed: {}", e);
                    report.failed.push(FailedItem {
                        name: item.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            measured = report.measured,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "Primary sizing complete"
        );
        Ok(report)
    }

    /// Measure the dependency set of `record` and record the sum.
    ///
    /// Failed dependencies contribute zero. An empty set records `0`.
    pub async fn size_library(
        &self,
        store: &dyn RepositoryStore,
        record: &RepositoryRecord,
        dependencies: &[DependencyIdentifier],
    ) -> Result<LibraryOutcome> {
        if record.is_sized(SizeField::Library) {
            return Ok(LibraryOutcome::AlreadySized);
        }
        if self.cancel.is_cancelled() {
            return Ok(LibraryOutcome::Cancelled);
        }

        let items: Vec<WorkItem> = dependencies
            .iter()
            .map(|dep| WorkItem::new(dep.as_str(), dep.as_str(), record.id))
            .collect();
        let total_items = items.len();

        let mut lines = 0u64;
        let mut measured = 0usize;
        let mut failed = Vec::new();
        let mut cancelled = false;

        let mut tasks = self.submit(items).await?;
        while let Some(joined) = tasks.join_next().await {
            let (item, result) = joined.map_err(PipelineError::join)?;
            match result {
                Ok(count) => {
                    debug!(dependency = %item.name, lines = count, "Measured dependency");
                    lines += count;
                    measured += 1;
                }
                Err(PipelineError::Cancelled) => cancelled = true,
                Err(e) => {
                    warn!(dependency = %item.name, "Dependency sizing failed: {}", e);
                    failed.push(FailedItem {
                        name: item.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if cancelled {
            return Ok(LibraryOutcome::Cancelled);
        }
        if total_items > 0 && measured == 0 {
            warn!(name = %record.name, failed = failed.len(), "No dependency could be measured");
            return Ok(LibraryOutcome::Unmeasured { failed });
        }

        store.set_size(record.id, SizeField::Library, lines)?;
        info!(
            name = %record.name,
            lines,
            dependencies = total_items,
            failed = failed.len(),
            "Recorded library codebase size"
        );
        Ok(LibraryOutcome::Recorded {
            lines,
            measured,
            failed,
        })
    }
}

/// Materialize, count and clean up one item.
async fn measure(
    materializer: &dyn Materializer,
    counter: &dyn LineCounter,
    scratch_dir: &Path,
    item: &WorkItem,
    timeout: Duration,
) -> Result<u64> {
    let workdir = tempfile::Builder::new()
        .prefix(&item.scratch_prefix())
        .tempdir_in(scratch_dir)?;

    let work = async {
        let path = materializer.materialize(&item.location, workdir.path()).await?;
        counter.count(&path).await
    };

    let result = match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::Timeout {
            what: item.name.clone(),
            secs: timeout.as_secs(),
        }),
    };

    if let Err(e) = materializer.release(workdir.path()).await {
        warn!(name = %item.name, "Release step failed: {}", e);
    }

    let path = workdir.path().to_path_buf();
    match tokio::task::spawn_blocking(move || workdir.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(path = %path.display(), "Failed to remove scratch directory: {}", e),
        Err(e) => warn!(path = %path.display(), "Scratch cleanup task failed: {}", e),
    }

    result
}
