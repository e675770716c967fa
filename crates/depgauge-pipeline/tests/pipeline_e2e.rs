//! End-to-end tests against stubbed remote services
//!
//! GitHub, Sourcegraph and raw content are served by wiremock; the sizing
//! tools are replaced by in-process fakes so no `git`, `go` or `gocloc`
//! binary is needed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use depgauge_config::HttpConfig;
use depgauge_core::{ManifestParser, RepositoryRecord, RepositoryStore, SizeField, SqliteStore};
use depgauge_pipeline::{
    DependencyGraphResolver, EnrichmentPipeline, GithubClient, HttpClient, LineCounter,
    Materializer, MetadataFetcher, PipelineError, RawContentClient, RemoteManifestSource,
    SizeCalculator, SourcegraphClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn http() -> HttpClient {
    HttpClient::new(&HttpConfig {
        timeout_secs: 5,
        max_retries: 1,
        retry_base_delay_ms: 1,
    })
    .unwrap()
}

fn github(server: &MockServer) -> GithubClient {
    GithubClient::new(
        http(),
        format!("{}/github", server.uri()),
        Some("gh-token".into()),
    )
}

fn sourcegraph(server: &MockServer) -> SourcegraphClient {
    SourcegraphClient::new(http(), format!("{}/sourcegraph", server.uri()), None)
}

fn metadata_body(open: u64, closed: u64, stars: u64, license: &str) -> serde_json::Value {
    json!({
        "data": {
            "repository": {
                "defaultBranchRef": {"target": {"history": {"totalCount": 321}}},
                "openIssues": {"totalCount": open},
                "closedIssues": {"totalCount": closed},
                "languages": {"totalSize": 4096},
                "stargazerCount": stars,
                "licenseInfo": {"key": license},
                "createdAt": "2019-04-01T10:00:00Z",
                "latestRelease": null,
                "primaryLanguage": {"name": "Go"}
            }
        }
    })
}

async fn mount_metadata(server: &MockServer, name: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/github"))
        .and(body_partial_json(
            json!({"variables": {"owner": "acme", "name": name}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Writes the artifact location into the workdir for the counter to read.
#[derive(Default)]
struct RecordingMaterializer {
    calls: AtomicUsize,
}

#[async_trait]
impl Materializer for RecordingMaterializer {
    async fn materialize(
        &self,
        location: &str,
        workdir: &Path,
    ) -> depgauge_pipeline::Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(workdir.join("artifact"), location)?;
        Ok(workdir.to_path_buf())
    }
}

/// Line counts by artifact location; unknown locations fail.
struct TableCounter {
    lines: HashMap<&'static str, u64>,
    calls: AtomicUsize,
}

impl TableCounter {
    fn new(lines: &[(&'static str, u64)]) -> Self {
        Self {
            lines: lines.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LineCounter for TableCounter {
    async fn count(&self, path: &Path) -> depgauge_pipeline::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let location = std::fs::read_to_string(path.join("artifact"))?;
        self.lines
            .get(location.as_str())
            .copied()
            .ok_or_else(|| PipelineError::process("table", format!("no count for {}", location)))
    }
}

// ============================================================================
// Metadata enrichment
// ============================================================================

#[tokio::test]
async fn test_metadata_enrichment_against_stub_api() {
    let server = MockServer::start().await;
    mount_metadata(&server, "widget", metadata_body(3, 5, 42, "mit")).await;

    let temp = TempDir::new().unwrap();
    let store = SqliteStore::open(&temp.path().join("depgauge.db")).unwrap();
    store
        .insert(&RepositoryRecord::new("acme/widget", "github.com/acme/widget"))
        .unwrap();

    let fetcher = MetadataFetcher::new(Arc::new(github(&server)), 20);
    let report = fetcher.enrich(&store).await.unwrap();

    assert_eq!(report.enriched, 1);
    assert!(report.failed.is_empty());

    let record = store.find_by_name("acme/widget").unwrap().unwrap();
    assert_eq!(record.open_issue_count, "3");
    assert_eq!(record.closed_issue_count, "5");
    assert_eq!(record.stargazer_count, "42");
    assert_eq!(record.license_info, "mit");
    assert_eq!(record.commit_count, "321");
    assert_eq!(record.primary_language, "Go");
    assert_eq!(record.original_codebase_size, "");
    assert_eq!(record.library_codebase_size, "");
}

#[tokio::test]
async fn test_metadata_failure_leaves_record_untouched() {
    let server = MockServer::start().await;
    mount_metadata(&server, "widget", metadata_body(1, 1, 1, "apache-2.0")).await;
    Mock::given(method("POST"))
        .and(path("/github"))
        .and(body_partial_json(
            json!({"variables": {"owner": "acme", "name": "ghost"}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": null},
            "errors": [{"message": "Could not resolve to a Repository"}]
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let store = SqliteStore::open(&temp.path().join("depgauge.db")).unwrap();
    store
        .insert(&RepositoryRecord::new("acme/widget", "github.com/acme/widget"))
        .unwrap();
    let ghost_id = store
        .insert(&RepositoryRecord::new("acme/ghost", "github.com/acme/ghost"))
        .unwrap();
    let before = store.find_by_id(ghost_id).unwrap().unwrap();

    let fetcher = MetadataFetcher::new(Arc::new(github(&server)), 2);
    let report = fetcher.enrich(&store).await.unwrap();

    assert_eq!(report.enriched, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "acme/ghost");
    assert_eq!(store.find_by_id(ghost_id).unwrap().unwrap(), before);
}

// ============================================================================
// Full run
// ============================================================================

const WIDGET_GO_MOD: &str = r#"module github.com/acme/widget

go 1.21

require (
    golang.org/x/sync v0.5.0
    github.com/pkg/errors v0.9.1 // indirect
)

replace github.com/acme/widget/tools => ./tools
"#;

const TOOLS_GO_MOD: &str = r#"module github.com/acme/widget/tools

require (
    github.com/pkg/errors v0.9.1
    golang.org/x/text v0.14.0
)
"#;

async fn mount_services(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sourcegraph"))
        .and(body_partial_json(json!({"variables": {
            "query": "lang:go AND select:repo AND repohasfile:go.mod AND count:10"
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"search": {"results": {"repositories": [
                {"name": "github.com/acme/widget"},
                {"name": "github.com/acme/gadget"}
            ]}}}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sourcegraph"))
        .and(body_partial_json(json!({"variables": {
            "name": "github.com/acme/widget", "path": "go.mod"
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": {"defaultBranch": {
                "displayName": "main",
                "target": {"commit": {"blob": {"content": WIDGET_GO_MOD}}}
            }}}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sourcegraph"))
        .and(body_partial_json(json!({"variables": {
            "name": "github.com/acme/gadget", "path": "go.mod"
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"repository": null}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/raw/acme/widget/main/tools/go.mod"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TOOLS_GO_MOD))
        .mount(server)
        .await;

    mount_metadata(server, "widget", metadata_body(3, 5, 42, "mit")).await;
    mount_metadata(server, "gadget", metadata_body(0, 2, 7, "bsd-3-clause")).await;
}

#[tokio::test]
async fn test_full_run_is_reentrant() {
    let server = MockServer::start().await;
    mount_services(&server).await;

    let temp = TempDir::new().unwrap();
    let store: Arc<dyn RepositoryStore> =
        Arc::new(SqliteStore::open(&temp.path().join("depgauge.db")).unwrap());
    for _ in 0..2 {
        store
            .insert(&RepositoryRecord::new("acme/gadget", "github.com/acme/gadget"))
            .unwrap();
    }

    let clone_tool = Arc::new(RecordingMaterializer::default());
    let module_tool = Arc::new(RecordingMaterializer::default());
    let counter = Arc::new(TableCounter::new(&[
        ("https://github.com/acme/widget.git", 1000),
        ("https://github.com/acme/gadget.git", 500),
        ("golang.org/x/sync@v0.5.0", 10),
        ("github.com/pkg/errors@v0.9.1", 20),
    ]));
    let scratch = temp.path().join("scratch");

    let sourcegraph = sourcegraph(&server);
    let resolver = DependencyGraphResolver::new(
        ManifestParser::new(),
        Arc::new(RemoteManifestSource::new(
            sourcegraph.clone(),
            RawContentClient::new(http()),
        )),
        format!("{}/raw", server.uri()),
        "master",
    );
    let pipeline = EnrichmentPipeline::new(
        Arc::clone(&store),
        Arc::new(sourcegraph),
        MetadataFetcher::new(Arc::new(github(&server)), 4),
        resolver,
        SizeCalculator::new(clone_tool.clone(), counter.clone(), &scratch, 2),
        SizeCalculator::new(module_tool.clone(), counter.clone(), &scratch, 4),
    )
    .with_discovery_count(10);

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.discovery.inserted, vec!["acme/widget".to_string()]);
    assert_eq!(report.discovery.existing, 1);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.enrichment.enriched, 2);
    assert_eq!(report.primary.measured, 2);
    assert_eq!(report.libraries.recorded, 2);
    assert_eq!(report.libraries.failed_dependencies, 1);

    let widget = store.find_by_name("acme/widget").unwrap().unwrap();
    assert_eq!(widget.stargazer_count, "42");
    assert_eq!(widget.original_codebase_size, "1000");
    // sync 10 + errors 20 + text (fails) 0
    assert_eq!(widget.library_codebase_size, "30");

    let gadget = store.find_by_name("acme/gadget").unwrap().unwrap();
    assert_eq!(gadget.original_codebase_size, "500");
    assert_eq!(gadget.library_codebase_size, "0");
    assert_eq!(store.all().unwrap().len(), 2);

    let cloned = clone_tool.calls.load(Ordering::SeqCst);
    let downloaded = module_tool.calls.load(Ordering::SeqCst);
    let counted = counter.calls.load(Ordering::SeqCst);
    assert_eq!(cloned, 2);
    assert_eq!(downloaded, 3);

    let second = pipeline.run().await.unwrap();

    assert!(second.discovery.inserted.is_empty());
    assert_eq!(second.duplicates_removed, 0);
    assert_eq!(second.primary.measured, 0);
    assert_eq!(second.primary.skipped, 2);
    assert_eq!(second.libraries.already_sized, 2);
    assert_eq!(clone_tool.calls.load(Ordering::SeqCst), cloned);
    assert_eq!(module_tool.calls.load(Ordering::SeqCst), downloaded);
    assert_eq!(counter.calls.load(Ordering::SeqCst), counted);

    assert!(std::fs::read_dir(&scratch).unwrap().next().is_none());
}

#[tokio::test]
async fn test_cancelled_pipeline_sizes_nothing() {
    let server = MockServer::start().await;
    mount_services(&server).await;

    let temp = TempDir::new().unwrap();
    let store: Arc<dyn RepositoryStore> = Arc::new(SqliteStore::in_memory().unwrap());

    let tool = Arc::new(RecordingMaterializer::default());
    let counter = Arc::new(TableCounter::new(&[]));
    let sourcegraph = sourcegraph(&server);
    let resolver = DependencyGraphResolver::new(
        ManifestParser::new(),
        Arc::new(RemoteManifestSource::new(
            sourcegraph.clone(),
            RawContentClient::new(http()),
        )),
        format!("{}/raw", server.uri()),
        "master",
    );
    let pipeline = EnrichmentPipeline::new(
        Arc::clone(&store),
        Arc::new(sourcegraph),
        MetadataFetcher::new(Arc::new(github(&server)), 4),
        resolver,
        SizeCalculator::new(tool.clone(), counter.clone(), temp.path(), 2),
        SizeCalculator::new(tool.clone(), counter.clone(), temp.path(), 2),
    )
    .with_discovery_count(10);

    pipeline.cancellation_token().cancel();
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.enrichment.enriched, 2);
    assert_eq!(report.primary.cancelled, 2);
    assert!(report.libraries.cancelled);
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    for record in store.all().unwrap() {
        assert!(!record.is_sized(SizeField::Original));
        assert!(!record.is_sized(SizeField::Library));
    }
}
