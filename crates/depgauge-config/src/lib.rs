//! depgauge Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.depgauge/config.toml`
//! - Local config: `.depgauge/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::{ConfigError, FileAction};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for depgauge.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DepgaugeConfig {
    /// Code-hosting platform (metadata queries, raw manifest content)
    pub github: GithubConfig,

    /// Code-search index (discovery, outer manifests)
    pub sourcegraph: SourcegraphConfig,

    /// Shared HTTP client settings
    pub http: HttpConfig,

    /// Metadata enrichment settings
    pub enrichment: EnrichmentConfig,

    /// Repository discovery settings
    pub discovery: DiscoveryConfig,

    /// Sizing pools and external tools
    pub sizing: SizingConfig,

    /// Repository store location
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// GitHub settings.
///
/// # Example TOML
///
/// ```toml
/// [github]
/// graphql_url = "https://api.github.com/graphql"
/// raw_content_url = "https://raw.githubusercontent.com"
/// token_env = "GITHUB_TOKEN"
/// default_branch = "master"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GithubConfig {
    /// GraphQL endpoint for repository metadata
    pub graphql_url: String,

    /// Base URL for raw file content (inner manifests)
    pub raw_content_url: String,

    /// Environment variable name containing the API token
    pub token_env: Option<String>,

    /// Branch for inner manifest URLs when the index reports none
    pub default_branch: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            graphql_url: "https://api.github.com/graphql".to_string(),
            raw_content_url: "https://raw.githubusercontent.com".to_string(),
            token_env: Some("GITHUB_TOKEN".to_string()),
            default_branch: "master".to_string(),
        }
    }
}

impl GithubConfig {
    /// Read the API token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        read_secret(self.token_env.as_deref())
    }
}

/// Sourcegraph settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcegraphConfig {
    /// GraphQL endpoint
    pub url: String,

    /// Environment variable name containing an access token (optional)
    pub token_env: Option<String>,
}

impl Default for SourcegraphConfig {
    fn default() -> Self {
        Self {
            url: "https://sourcegraph.com/.api/graphql".to_string(),
            token_env: None,
        }
    }
}

impl SourcegraphConfig {
    /// Read the access token, if one is configured and set.
    pub fn token(&self) -> Option<String> {
        read_secret(self.token_env.as_deref())
    }
}

fn read_secret(env_name: Option<&str>) -> Option<String> {
    env_name
        .and_then(|name| std::env::var(name).ok())
        .filter(|value| !value.trim().is_empty())
}

/// Upper bound accepted for `http.max_retries`.
pub const MAX_HTTP_RETRIES: u32 = 10;

/// HTTP client configuration shared by all remote clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retry attempts for transient failures
    pub max_retries: u32,

    /// First backoff delay; doubles on each retry
    pub retry_base_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Metadata enrichment configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Maximum metadata queries in flight
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { concurrency: 20 }
    }
}

/// Repository discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Number of repositories requested from the search index
    pub count: usize,

    /// Language filter for the search query
    pub language: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            count: 100,
            language: "go".to_string(),
        }
    }
}

/// Sizing configuration: worker pools, scratch space and external tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizingConfig {
    /// Shared scratch directory; created if absent
    pub scratch_dir: PathBuf,

    /// Concurrent primary repository clones
    pub primary_workers: usize,

    /// Concurrent dependency downloads per repository
    pub dependency_workers: usize,

    /// Upper bound for one materialize + count, in seconds
    pub item_timeout_secs: u64,

    /// Version control program used for shallow clones
    pub git_program: String,

    /// Go toolchain used for module downloads
    pub go_program: String,

    /// Line-counting program (must support `--output-type=json`)
    pub oracle_program: String,

    /// Manifest file name appended to inner manifest URLs
    pub manifest_filename: String,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("tmp"),
            primary_workers: 20,
            dependency_workers: 50,
            item_timeout_secs: 1800,
            git_program: "git".to_string(),
            go_program: "go".to_string(),
            oracle_program: "gocloc".to_string(),
            manifest_filename: "go.mod".to_string(),
        }
    }
}

impl SizingConfig {
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }
}

/// Repository store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("depgauge.db"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override store path
    pub store_path: Option<PathBuf>,

    /// Override scratch directory
    pub scratch_dir: Option<PathBuf>,

    /// Override metadata concurrency
    pub concurrency: Option<usize>,

    /// Override primary sizing pool
    pub primary_workers: Option<usize>,

    /// Override dependency sizing pool
    pub dependency_workers: Option<usize>,

    /// Override discovery count
    pub discovery_count: Option<usize>,

    /// Override log level
    pub log_level: Option<String>,
}

impl DepgaugeConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref path) = overrides.store_path {
            self.store.path = path.clone();
        }

        if let Some(ref dir) = overrides.scratch_dir {
            self.sizing.scratch_dir = dir.clone();
        }

        if let Some(concurrency) = overrides.concurrency {
            self.enrichment.concurrency = concurrency;
        }

        if let Some(workers) = overrides.primary_workers {
            self.sizing.primary_workers = workers;
        }

        if let Some(workers) = overrides.dependency_workers {
            self.sizing.dependency_workers = workers;
        }

        if let Some(count) = overrides.discovery_count {
            self.discovery.count = count;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    ///
    /// Pool sizes must be at least one, retries at most
    /// [`MAX_HTTP_RETRIES`], and endpoints must be set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enrichment.concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "enrichment.concurrency",
                "must be at least 1",
            ));
        }
        if self.sizing.primary_workers == 0 {
            return Err(ConfigError::invalid_value(
                "sizing.primary_workers",
                "must be at least 1",
            ));
        }
        if self.sizing.dependency_workers == 0 {
            return Err(ConfigError::invalid_value(
                "sizing.dependency_workers",
                "must be at least 1",
            ));
        }
        if self.sizing.item_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "sizing.item_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "http.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.http.max_retries > MAX_HTTP_RETRIES {
            return Err(ConfigError::invalid_value(
                "http.max_retries",
                format!("must be at most {}", MAX_HTTP_RETRIES),
            ));
        }

        for (key, value) in [
            ("github.graphql_url", &self.github.graphql_url),
            ("github.raw_content_url", &self.github.raw_content_url),
            ("github.default_branch", &self.github.default_branch),
            ("sourcegraph.url", &self.sourcegraph.url),
            ("sizing.oracle_program", &self.sizing.oracle_program),
            ("sizing.manifest_filename", &self.sizing.manifest_filename),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::missing_value(key));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DepgaugeConfig::default();
        assert_eq!(config.enrichment.concurrency, 20);
        assert_eq!(config.sizing.primary_workers, 20);
        assert_eq!(config.sizing.dependency_workers, 50);
        assert_eq!(config.sizing.scratch_dir, PathBuf::from("tmp"));
        assert_eq!(config.http.timeout(), Duration::from_secs(600));
        assert_eq!(config.github.token_env.as_deref(), Some("GITHUB_TOKEN"));
        assert_eq!(config.github.default_branch, "master");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = DepgaugeConfig::default();
        let overrides = ConfigOverrides {
            store_path: Some(PathBuf::from("/data/repos.db")),
            dependency_workers: Some(8),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.store.path, PathBuf::from("/data/repos.db"));
        assert_eq!(config.sizing.dependency_workers, 8);
        assert_eq!(config.sizing.primary_workers, 20);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validate_zero_pool() {
        let mut config = DepgaugeConfig::default();
        config.sizing.dependency_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sizing.dependency_workers"));
    }

    #[test]
    fn test_validate_missing_endpoint() {
        let mut config = DepgaugeConfig::default();
        config.sourcegraph.url = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { .. }));
        assert_eq!(err.key(), Some("sourcegraph.url"));
    }

    #[test]
    fn test_validate_retry_bound() {
        let mut config = DepgaugeConfig::default();
        config.http.max_retries = MAX_HTTP_RETRIES;
        assert!(config.validate().is_ok());

        config.http.max_retries = 100;
        let err = config.validate().unwrap_err();
        assert_eq!(err.key(), Some("http.max_retries"));
    }

    #[test]
    fn test_token_from_env() {
        let github = GithubConfig {
            token_env: Some("DEPGAUGE_TEST_TOKEN_UNSET_VAR".to_string()),
            ..Default::default()
        };
        assert!(github.token().is_none());

        let sourcegraph = SourcegraphConfig::default();
        assert!(sourcegraph.token().is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: DepgaugeConfig = toml::from_str(
            r#"
            [sizing]
            primary_workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.sizing.primary_workers, 4);
        assert_eq!(config.sizing.dependency_workers, 50);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = DepgaugeConfig::default();
        config.logging.format = LogFormat::Json;
        config.sourcegraph.token_env = Some("SRC_ACCESS_TOKEN".to_string());

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: DepgaugeConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }
}
