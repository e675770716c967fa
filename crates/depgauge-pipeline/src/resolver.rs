//! Dependency Graph Resolution
//!
//! Turns one repository's outer manifest into its final dependency list:
//! outer dependencies, plus the dependencies of every inner manifest that a
//! `replace ... => ./path` directive points at, deduplicated in line order.
//! Inner manifests are read one level deep and fetched sequentially, from
//! the same branch the outer manifest was read on.

use std::sync::Arc;

use async_trait::async_trait;
use depgauge_core::{
    dedup, DependencyIdentifier, InnerManifestBase, ManifestParser, RepositoryRecord,
};
use tracing::{debug, warn};

use crate::clients::{BranchFile, RawContentClient, SourcegraphClient};
use crate::error::Result;

/// Where manifest documents come from.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// The repository's own manifest with the branch it was read from, or
    /// `None` if it has none.
    async fn outer_manifest(
        &self,
        record: &RepositoryRecord,
        filename: &str,
    ) -> Result<Option<BranchFile>>;

    /// An inner manifest by its composed URL.
    async fn inner_manifest(&self, url: &str) -> Result<String>;
}

/// Outer manifests from the code-search index, inner manifests over raw GET.
pub struct RemoteManifestSource {
    sourcegraph: SourcegraphClient,
    raw: RawContentClient,
}

impl RemoteManifestSource {
    pub fn new(sourcegraph: SourcegraphClient, raw: RawContentClient) -> Self {
        Self { sourcegraph, raw }
    }
}

#[async_trait]
impl ManifestSource for RemoteManifestSource {
    async fn outer_manifest(
        &self,
        record: &RepositoryRecord,
        filename: &str,
    ) -> Result<Option<BranchFile>> {
        self.sourcegraph.file_content(&record.url, filename).await
    }

    async fn inner_manifest(&self, url: &str) -> Result<String> {
        self.raw.fetch(url).await
    }
}

/// An inner manifest that could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerFailure {
    pub url: String,
    pub error: String,
}

/// Final dependency list of one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Deduplicated, in first-seen manifest line order
    pub dependencies: Vec<DependencyIdentifier>,
    /// Inner manifests that were read successfully
    pub inner_manifests: Vec<String>,
    pub failed_inner: Vec<InnerFailure>,
    /// Redirect lines that pointed nowhere usable
    pub skipped_redirects: Vec<String>,
}

pub struct DependencyGraphResolver {
    parser: ManifestParser,
    source: Arc<dyn ManifestSource>,
    raw_base: String,
    fallback_branch: String,
}

impl DependencyGraphResolver {
    /// `fallback_branch` is used only when the outer manifest arrives
    /// without a branch name.
    pub fn new(
        parser: ManifestParser,
        source: Arc<dyn ManifestSource>,
        raw_base: impl Into<String>,
        fallback_branch: impl Into<String>,
    ) -> Self {
        Self {
            parser,
            source,
            raw_base: raw_base.into(),
            fallback_branch: fallback_branch.into(),
        }
    }

    fn base_for(
        &self,
        record: &RepositoryRecord,
        branch: Option<&str>,
    ) -> Option<InnerManifestBase> {
        let coords = record.coordinates()?;
        Some(InnerManifestBase::new(
            self.raw_base.clone(),
            coords.owner,
            coords.name,
            branch.unwrap_or(&self.fallback_branch),
        ))
    }

    /// Resolve from already retrieved outer manifest text.
    pub async fn resolve(&self, outer: &str, base: &InnerManifestBase) -> Resolution {
        let parsed = self.parser.parse(outer, base);
        let mut dependencies = parsed.dependencies;
        let mut resolution = Resolution {
            skipped_redirects: parsed.skipped_redirects,
            ..Default::default()
        };

        for url in parsed.inner_manifests {
            match self.source.inner_manifest(&url).await {
                Ok(content) => {
                    let inner = self.parser.parse_dependencies(&content);
                    debug!(url = %url, dependencies = inner.len(), "Resolved inner manifest");
                    dependencies.extend(inner);
                    resolution.inner_manifests.push(url);
                }
                Err(e) => {
                    warn!(url = %url, "Inner manifest unavailable: {}", e);
                    resolution.failed_inner.push(InnerFailure {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }

        resolution.dependencies = dedup(dependencies);
        resolution
    }

    /// Fetch the outer manifest of `record` and resolve it.
    ///
    /// A repository without a manifest (or without owner/name) resolves to
    /// an empty list.
    pub async fn resolve_repository(&self, record: &RepositoryRecord) -> Result<Resolution> {
        if record.coordinates().is_none() {
            debug!(name = %record.name, "No owner/name in URL, nothing to resolve");
            return Ok(Resolution::default());
        }

        let outer = self
            .source
            .outer_manifest(record, self.parser.filename())
            .await?;

        let Some(outer) = outer else {
            debug!(name = %record.name, "Repository has no manifest");
            return Ok(Resolution::default());
        };
        let Some(base) = self.base_for(record, outer.branch.as_deref()) else {
            return Ok(Resolution::default());
        };
        Ok(self.resolve(&outer.content, &base).await)
    }
}
