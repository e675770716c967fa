//! Enrichment Pipeline
//!
//! Sequences one invocation:
//!
//! 1. discovery of candidate repositories
//! 2. dedup over record names
//! 3. metadata enrichment (blocking)
//! 4. primary sizing, spawned and awaited before returning
//! 5. per-repository dependency resolution and library sizing, one
//!    repository at a time
//!
//! Every phase is also callable on its own. Re-running against a partially
//! enriched store only measures fields that are still unset.

use std::sync::Arc;

use depgauge_config::DepgaugeConfig;
use depgauge_core::{ManifestParser, RepositoryStore, SizeField};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::{GithubClient, RawContentClient, SourcegraphClient};
use crate::discovery::{discover_repositories, remove_duplicates, DiscoveryReport, DiscoverySource};
use crate::error::{PipelineError, Result};
use crate::fetcher::{EnrichmentReport, MetadataFetcher};
use crate::resolver::{DependencyGraphResolver, RemoteManifestSource};
use crate::sizing::{
    ClocCounter, FailedItem, GitCloneMaterializer, GoModuleMaterializer, LibraryOutcome,
    SizeCalculator, SizingReport,
};

/// Outcome of the library sizing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryReport {
    /// Repositories whose library size was written
    pub recorded: usize,
    pub already_sized: usize,
    /// Repositories where every dependency failed
    pub unmeasured: Vec<String>,
    /// Repositories whose manifest could not be retrieved
    pub unresolved: Vec<FailedItem>,
    /// Dependencies that failed and counted as zero
    pub failed_dependencies: usize,
    pub cancelled: bool,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub discovery: DiscoveryReport,
    pub duplicates_removed: usize,
    pub enrichment: EnrichmentReport,
    pub primary: SizingReport,
    pub libraries: LibraryReport,
}

pub struct EnrichmentPipeline {
    store: Arc<dyn RepositoryStore>,
    discovery: Arc<dyn DiscoverySource>,
    fetcher: MetadataFetcher,
    resolver: DependencyGraphResolver,
    primary: Arc<SizeCalculator>,
    libraries: SizeCalculator,
    discovery_count: usize,
    cancel: CancellationToken,
}

impl EnrichmentPipeline {
    /// Assemble a pipeline from its parts.
    ///
    /// Both calculators are bound to the pipeline's cancellation token.
    pub fn new(
        store: Arc<dyn RepositoryStore>,
        discovery: Arc<dyn DiscoverySource>,
        fetcher: MetadataFetcher,
        resolver: DependencyGraphResolver,
        primary: SizeCalculator,
        libraries: SizeCalculator,
    ) -> Self {
        let cancel = CancellationToken::new();
        Self {
            store,
            discovery,
            fetcher,
            resolver,
            primary: Arc::new(primary.with_cancellation(cancel.child_token())),
            libraries: libraries.with_cancellation(cancel.child_token()),
            discovery_count: 100,
            cancel,
        }
    }

    /// Wire the production clients and tools from configuration.
    pub fn from_config(config: &DepgaugeConfig, store: Arc<dyn RepositoryStore>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let github = GithubClient::from_config(&config.github, &config.http)?;
        let sourcegraph = SourcegraphClient::from_config(&config.sourcegraph, &config.http)?
            .with_language(config.discovery.language.clone())
            .with_manifest_filename(config.sizing.manifest_filename.clone());
        let raw = RawContentClient::from_config(&config.http)?;

        let fetcher = MetadataFetcher::new(Arc::new(github), config.enrichment.concurrency);
        let resolver = DependencyGraphResolver::new(
            ManifestParser::with_filename(config.sizing.manifest_filename.clone()),
            Arc::new(RemoteManifestSource::new(sourcegraph.clone(), raw)),
            config.github.raw_content_url.clone(),
            config.github.default_branch.clone(),
        );

        let sizing = &config.sizing;
        let counter = Arc::new(ClocCounter::new(sizing.oracle_program.clone()));
        let primary = SizeCalculator::new(
            Arc::new(GitCloneMaterializer::new(sizing.git_program.clone())),
            counter.clone(),
            sizing.scratch_dir.clone(),
            sizing.primary_workers,
        )
        .with_item_timeout(sizing.item_timeout());
        let libraries = SizeCalculator::new(
            Arc::new(GoModuleMaterializer::new(sizing.go_program.clone())),
            counter,
            sizing.scratch_dir.clone(),
            sizing.dependency_workers,
        )
        .with_item_timeout(sizing.item_timeout());

        Ok(Self::new(
            store,
            Arc::new(sourcegraph),
            fetcher,
            resolver,
            primary,
            libraries,
        )
        .with_discovery_count(config.discovery.count))
    }

    pub fn with_discovery_count(mut self, count: usize) -> Self {
        self.discovery_count = count;
        self
    }

    /// Token that stops new work when cancelled; in-flight items drain.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<dyn RepositoryStore> {
        &self.store
    }

    pub async fn discover(&self) -> Result<DiscoveryReport> {
        discover_repositories(&*self.store, &*self.discovery, self.discovery_count).await
    }

    pub fn dedup(&self) -> Result<usize> {
        remove_duplicates(&*self.store)
    }

    pub async fn enrich(&self) -> Result<EnrichmentReport> {
        self.fetcher.enrich(&*self.store).await
    }

    pub async fn size_primary(&self) -> Result<SizingReport> {
        self.primary.size_primary(&*self.store).await
    }

    /// Resolve and size the dependency set of every repository, one at a time.
    pub async fn size_libraries(&self) -> Result<LibraryReport> {
        let mut report = LibraryReport::default();

        for record in self.store.all()? {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if record.is_sized(SizeField::Library) {
                report.already_sized += 1;
                continue;
            }

            let resolution = match self.resolver.resolve_repository(&record).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!(name = %record.name, "Dependency resolution failed: {}", e);
                    report.unresolved.push(FailedItem {
                        name: record.name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            info!(
                name = %record.name,
                dependencies = resolution.dependencies.len(),
                inner_manifests = resolution.inner_manifests.len(),
                "Resolved dependencies"
            );

            match self
                .libraries
                .size_library(&*self.store, &record, &resolution.dependencies)
                .await?
            {
                LibraryOutcome::AlreadySized => report.already_sized += 1,
                LibraryOutcome::Recorded { failed, .. } => {
                    report.recorded += 1;
                    report.failed_dependencies += failed.len();
                }
                LibraryOutcome::Unmeasured { failed } => {
                    report.failed_dependencies += failed.len();
                    report.unmeasured.push(record.name.clone());
                }
                LibraryOutcome::Cancelled => {
                    report.cancelled = true;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Run every phase in order.
    pub async fn run(&self) -> Result<PipelineReport> {
        let discovery = self.discover().await?;
        let duplicates_removed = self.dedup()?;
        let enrichment = self.enrich().await?;

        let primary = Arc::clone(&self.primary);
        let store = Arc::clone(&self.store);
        let primary_handle = tokio::spawn(async move { primary.size_primary(&*store).await });

        // Await primary sizing before surfacing a library error
        let libraries = self.size_libraries().await;
        let primary = primary_handle.await.map_err(PipelineError::join)??;
        let libraries = libraries?;

        let report = PipelineReport {
            discovery,
            duplicates_removed,
            enrichment,
            primary,
            libraries,
        };

        info!(
            inserted = report.discovery.inserted.len(),
            duplicates_removed = report.duplicates_removed,
            enriched = report.enrichment.enriched,
            primary_measured = report.primary.measured,
            libraries_recorded = report.libraries.recorded,
            "Pipeline complete"
        );
        Ok(report)
    }
}
