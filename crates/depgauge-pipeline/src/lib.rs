//! depgauge Pipeline - concurrent enrichment and sizing of Go repositories
//!
//! This crate drives the remote and process-bound work:
//! - Discovery of candidate repositories and the record-name dedup pass
//! - Bounded-concurrency metadata enrichment
//! - Dependency resolution across outer and inner `go.mod` manifests
//! - Codebase and dependency-set sizing on a bounded worker pool
//!
//! ## Seams
//!
//! Every remote service and external tool sits behind an object-safe trait
//! so phases can be exercised against fakes:
//!
//! - [`DiscoverySource`], [`MetadataSource`], [`ManifestSource`]
//! - [`Materializer`], [`LineCounter`]
//!
//! ## Example
//!
//! ```ignore
//! use depgauge_config::DepgaugeConfig;
//! use depgauge_core::SqliteStore;
//! use depgauge_pipeline::EnrichmentPipeline;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DepgaugeConfig::default();
//!     let store = Arc::new(SqliteStore::open(&config.store.path)?);
//!     let pipeline = EnrichmentPipeline::from_config(&config, store)?;
//!     let report = pipeline.run().await?;
//!     println!("{} repositories enriched", report.enrichment.enriched);
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod resolver;
pub mod sizing;

pub use clients::{BranchFile, GithubClient, HttpClient, RawContentClient, SourcegraphClient};
pub use discovery::{discover_repositories, remove_duplicates, DiscoveryReport, DiscoverySource};
pub use error::{PipelineError, Result};
pub use fetcher::{
    EnrichmentReport, FailedRecord, MetadataFetcher, MetadataSource, RepositoryMetadata,
};
pub use pipeline::{EnrichmentPipeline, LibraryReport, PipelineReport};
pub use resolver::{
    DependencyGraphResolver, InnerFailure, ManifestSource, RemoteManifestSource, Resolution,
};
pub use sizing::{
    ClocCounter, FailedItem, GitCloneMaterializer, GoModuleMaterializer, LibraryOutcome,
    LineCounter, Materializer, SizeCalculator, SizingReport, DEFAULT_ITEM_TIMEOUT,
};
