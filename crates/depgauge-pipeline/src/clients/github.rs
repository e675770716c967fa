//! GitHub GraphQL metadata client
//!
//! # Endpoint Format
//!
//! - POST `{graphql_url}` with `Authorization: Bearer <token>`
//! - Request: `{"query": "...", "variables": {"owner": "...", "name": "..."}}`
//! - Response: `{"data": {"repository": {...}}}`

use async_trait::async_trait;
use depgauge_config::{GithubConfig, HttpConfig};
use depgauge_core::RepositoryCoordinates;
use serde::Deserialize;
use serde_json::json;

use super::http::HttpClient;
use crate::error::{PipelineError, Result};
use crate::fetcher::{MetadataSource, RepositoryMetadata};

const REPOSITORY_METADATA_QUERY: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    defaultBranchRef {
      target {
        ... on Commit {
          history { totalCount }
        }
      }
    }
    openIssues: issues(states: OPEN) { totalCount }
    closedIssues: issues(states: CLOSED) { totalCount }
    languages { totalSize }
    stargazerCount
    licenseInfo { key }
    createdAt
    latestRelease { publishedAt }
    primaryLanguage { name }
  }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct CommitTarget {
    history: Option<TotalCount>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    target: Option<CommitTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Languages {
    total_size: u64,
}

#[derive(Debug, Deserialize)]
struct LicenseInfo {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Release {
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrimaryLanguage {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    default_branch_ref: Option<BranchRef>,
    open_issues: TotalCount,
    closed_issues: TotalCount,
    languages: Option<Languages>,
    stargazer_count: u64,
    license_info: Option<LicenseInfo>,
    created_at: String,
    latest_release: Option<Release>,
    primary_language: Option<PrimaryLanguage>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

impl From<RepositoryNode> for RepositoryMetadata {
    fn from(node: RepositoryNode) -> Self {
        Self {
            commit_count: node
                .default_branch_ref
                .and_then(|r| r.target)
                .and_then(|t| t.history)
                .map(|h| h.total_count),
            open_issue_count: node.open_issues.total_count,
            closed_issue_count: node.closed_issues.total_count,
            language_bytes: node.languages.map(|l| l.total_size),
            stargazer_count: node.stargazer_count,
            creation_date: node.created_at,
            license_key: node.license_info.map(|l| l.key),
            latest_release: node.latest_release.and_then(|r| r.published_at),
            primary_language: node.primary_language.map(|l| l.name),
        }
    }
}

/// Client for repository metadata.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: HttpClient,
    graphql_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(http: HttpClient, graphql_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            graphql_url: graphql_url.into(),
            token,
        }
    }

    /// Build a client from configuration, reading the token from the
    /// configured environment variable.
    pub fn from_config(github: &GithubConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self::new(
            HttpClient::new(http)?,
            github.graphql_url.clone(),
            github.token(),
        ))
    }

    /// Query metadata for one repository.
    pub async fn repository_metadata(
        &self,
        coords: &RepositoryCoordinates,
    ) -> Result<RepositoryMetadata> {
        let data: RepositoryData = self
            .http
            .graphql(
                &self.graphql_url,
                self.token.as_deref(),
                REPOSITORY_METADATA_QUERY,
                json!({ "owner": coords.owner, "name": coords.name }),
            )
            .await?;

        data.repository
            .map(RepositoryMetadata::from)
            .ok_or_else(|| PipelineError::NotFound(coords.full_name()))
    }
}

#[async_trait]
impl MetadataSource for GithubClient {
    async fn fetch(&self, coords: &RepositoryCoordinates) -> Result<RepositoryMetadata> {
        self.repository_metadata(coords).await
    }
}
