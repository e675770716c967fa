//! Sourcegraph GraphQL client: repository discovery and outer manifests.

use async_trait::async_trait;
use depgauge_config::{HttpConfig, SourcegraphConfig};
use depgauge_core::MANIFEST_FILENAME;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http::HttpClient;
use crate::discovery::DiscoverySource;
use crate::error::Result;

const SEARCH_QUERY: &str = r#"
query($query: String!) {
  search(query: $query, version: V2) {
    results {
      repositories { name }
    }
  }
}
"#;

const BLOB_QUERY: &str = r#"
query($name: String!, $path: String!) {
  repository(name: $name) {
    defaultBranch {
      displayName
      target {
        commit {
          blob(path: $path) { content }
        }
      }
    }
  }
}
"#;

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct RepositoryName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    repositories: Vec<RepositoryName>,
}

#[derive(Debug, Deserialize)]
struct Search {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: Search,
}

#[derive(Debug, Deserialize)]
struct Blob {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Commit {
    blob: Option<Blob>,
}

#[derive(Debug, Deserialize)]
struct Target {
    commit: Option<Commit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefaultBranch {
    display_name: Option<String>,
    target: Option<Target>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobRepository {
    default_branch: Option<DefaultBranch>,
}

#[derive(Debug, Deserialize)]
struct BlobData {
    repository: Option<BlobRepository>,
}

/// A file read from a repository's default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFile {
    pub content: String,
    /// Short branch name (`main`), when the index reports it
    pub branch: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the code-search index.
#[derive(Debug, Clone)]
pub struct SourcegraphClient {
    http: HttpClient,
    url: String,
    token: Option<String>,
    language: String,
    manifest_filename: String,
}

impl SourcegraphClient {
    pub fn new(http: HttpClient, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            url: url.into(),
            token,
            language: "go".to_string(),
            manifest_filename: MANIFEST_FILENAME.to_string(),
        }
    }

    pub fn from_config(sourcegraph: &SourcegraphConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self::new(
            HttpClient::new(http)?,
            sourcegraph.url.clone(),
            sourcegraph.token(),
        ))
    }

    /// Set the language filter used for discovery.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the manifest file a discovered repository must carry.
    pub fn with_manifest_filename(mut self, filename: impl Into<String>) -> Self {
        self.manifest_filename = filename.into();
        self
    }

    /// Search query selecting repositories that carry the manifest file.
    pub fn search_query(&self, count: usize) -> String {
        format!(
            "lang:{} AND select:repo AND repohasfile:{} AND count:{}",
            self.language, self.manifest_filename, count
        )
    }

    /// Names (`github.com/owner/repo`) of up to `count` matching repositories.
    pub async fn search_repositories(&self, count: usize) -> Result<Vec<String>> {
        let data: SearchData = self
            .http
            .graphql(
                &self.url,
                self.token.as_deref(),
                SEARCH_QUERY,
                json!({ "query": self.search_query(count) }),
            )
            .await?;

        let names: Vec<String> = data
            .search
            .results
            .repositories
            .into_iter()
            .map(|r| r.name)
            .collect();
        debug!(count = names.len(), "Search returned repositories");
        Ok(names)
    }

    /// Content of `path` on the default branch of `repository`, with the
    /// branch name.
    ///
    /// Returns `Ok(None)` when the repository or file does not exist.
    pub async fn file_content(
        &self,
        repository: &str,
        path: &str,
    ) -> Result<Option<BranchFile>> {
        let data: BlobData = self
            .http
            .graphql(
                &self.url,
                self.token.as_deref(),
                BLOB_QUERY,
                json!({ "name": repository, "path": path }),
            )
            .await?;

        let Some(branch) = data.repository.and_then(|r| r.default_branch) else {
            return Ok(None);
        };
        let content = branch
            .target
            .and_then(|t| t.commit)
            .and_then(|c| c.blob)
            .map(|b| b.content);

        Ok(content.map(|content| BranchFile {
            content,
            branch: branch.display_name.filter(|name| !name.is_empty()),
        }))
    }
}

#[async_trait]
impl DiscoverySource for SourcegraphClient {
    async fn discover(&self, count: usize) -> Result<Vec<String>> {
        self.search_repositories(count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> SourcegraphClient {
        let http = HttpClient::new(&HttpConfig {
            timeout_secs: 5,
            max_retries: 0,
            retry_base_delay_ms: 1,
        })
        .unwrap();
        SourcegraphClient::new(http, server.uri(), None)
    }

    #[test]
    fn test_search_query() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let client = SourcegraphClient::new(http, "http://localhost", None);
        assert_eq!(
            client.search_query(50),
            "lang:go AND select:repo AND repohasfile:go.mod AND count:50"
        );
    }

    #[test]
    fn test_search_query_follows_manifest_filename() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let client = SourcegraphClient::new(http, "http://localhost", None)
            .with_manifest_filename("go.work");
        assert_eq!(
            client.search_query(5),
            "lang:go AND select:repo AND repohasfile:go.work AND count:5"
        );
    }

    #[tokio::test]
    async fn test_search_repositories() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": {"query": "lang:go AND select:repo AND repohasfile:go.mod AND count:2"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"search": {"results": {"repositories": [
                    {"name": "github.com/acme/widget"},
                    {"name": "github.com/acme/gadget"}
                ]}}}
            })))
            .mount(&server)
            .await;

        let names = test_client(&server).search_repositories(2).await.unwrap();
        assert_eq!(names, vec!["github.com/acme/widget", "github.com/acme/gadget"]);
    }

    #[tokio::test]
    async fn test_file_content() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "variables": {"name": "github.com/acme/widget", "path": "go.mod"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"repository": {"defaultBranch": {
                    "displayName": "main",
                    "target": {"commit": {
                        "blob": {"content": "module github.com/acme/widget\n"}
                    }}
                }}}
            })))
            .mount(&server)
            .await;

        let content = test_client(&server)
            .file_content("github.com/acme/widget", "go.mod")
            .await
            .unwrap();
        assert_eq!(
            content,
            Some(BranchFile {
                content: "module github.com/acme/widget\n".into(),
                branch: Some("main".into()),
            })
        );
    }

    #[tokio::test]
    async fn test_file_content_missing_blob() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"repository": {"defaultBranch": {"target": {"commit": {"blob": null}}}}}
            })))
            .mount(&server)
            .await;

        let content = test_client(&server)
            .file_content("github.com/acme/widget", "go.mod")
            .await
            .unwrap();
        assert!(content.is_none());
    }
}
