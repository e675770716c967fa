//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.depgauge/config.toml`
//! 2. Local config: `.depgauge/config.toml` (in the working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones. A field that still holds its default
//! value in a later source does not override an earlier one.

use crate::error::ConfigError;
use crate::{
    ConfigOverrides, DepgaugeConfig, DiscoveryConfig, EnrichmentConfig, GithubConfig, HttpConfig,
    LoggingConfig, SizingConfig, SourcegraphConfig, StoreConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global and local configuration directory name.
const CONFIG_DIR: &str = ".depgauge";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.depgauge`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<DepgaugeConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.depgauge`).
    pub fn new() -> Self {
        Self {
            global_config_dir: dirs::home_dir().map(|h| h.join(CONFIG_DIR)),
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration rooted at `root` with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<DepgaugeConfig, ConfigError> {
        let mut config = DepgaugeConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load a single explicit config file over the defaults, then overrides.
    ///
    /// Used when the CLI is given `--config <path>`; global and local files
    /// are not consulted.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<DepgaugeConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(DepgaugeConfig::default(), load_config_file(path)?);
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<DepgaugeConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;
        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration.
    pub fn load_local(&self, root: &Path) -> Result<Option<DepgaugeConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Write a default local configuration if none exists yet.
    ///
    /// Returns the path of the config file.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let config_path = self.local_config_path(root);
        if !config_path.exists() {
            save_config_file(&config_path, &DepgaugeConfig::default())?;
        }
        Ok(config_path)
    }

    pub fn save_local(&self, root: &Path, config: &DepgaugeConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn load_config_file(path: &Path) -> Result<DepgaugeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
}

fn save_config_file(path: &Path, config: &DepgaugeConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Pick `overlay` unless it still equals the default.
fn pick<T: PartialEq>(base: T, overlay: T, default: &T) -> T {
    if overlay != *default {
        overlay
    } else {
        base
    }
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: DepgaugeConfig, overlay: DepgaugeConfig) -> DepgaugeConfig {
    DepgaugeConfig {
        github: merge_github(base.github, overlay.github),
        sourcegraph: merge_sourcegraph(base.sourcegraph, overlay.sourcegraph),
        http: merge_http(base.http, overlay.http),
        enrichment: merge_enrichment(base.enrichment, overlay.enrichment),
        discovery: merge_discovery(base.discovery, overlay.discovery),
        sizing: merge_sizing(base.sizing, overlay.sizing),
        store: merge_store(base.store, overlay.store),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_github(base: GithubConfig, overlay: GithubConfig) -> GithubConfig {
    let d = GithubConfig::default();
    GithubConfig {
        graphql_url: pick(base.graphql_url, overlay.graphql_url, &d.graphql_url),
        raw_content_url: pick(base.raw_content_url, overlay.raw_content_url, &d.raw_content_url),
        token_env: pick(base.token_env, overlay.token_env, &d.token_env),
        default_branch: pick(base.default_branch, overlay.default_branch, &d.default_branch),
    }
}

fn merge_sourcegraph(base: SourcegraphConfig, overlay: SourcegraphConfig) -> SourcegraphConfig {
    let d = SourcegraphConfig::default();
    SourcegraphConfig {
        url: pick(base.url, overlay.url, &d.url),
        token_env: overlay.token_env.or(base.token_env),
    }
}

fn merge_http(base: HttpConfig, overlay: HttpConfig) -> HttpConfig {
    let d = HttpConfig::default();
    HttpConfig {
        timeout_secs: pick(base.timeout_secs, overlay.timeout_secs, &d.timeout_secs),
        max_retries: pick(base.max_retries, overlay.max_retries, &d.max_retries),
        retry_base_delay_ms: pick(
            base.retry_base_delay_ms,
            overlay.retry_base_delay_ms,
            &d.retry_base_delay_ms,
        ),
    }
}

fn merge_enrichment(base: EnrichmentConfig, overlay: EnrichmentConfig) -> EnrichmentConfig {
    let d = EnrichmentConfig::default();
    EnrichmentConfig {
        concurrency: pick(base.concurrency, overlay.concurrency, &d.concurrency),
    }
}

fn merge_discovery(base: DiscoveryConfig, overlay: DiscoveryConfig) -> DiscoveryConfig {
    let d = DiscoveryConfig::default();
    DiscoveryConfig {
        count: pick(base.count, overlay.count, &d.count),
        language: pick(base.language, overlay.language, &d.language),
    }
}

fn merge_sizing(base: SizingConfig, overlay: SizingConfig) -> SizingConfig {
    let d = SizingConfig::default();
    SizingConfig {
        scratch_dir: pick(base.scratch_dir, overlay.scratch_dir, &d.scratch_dir),
        primary_workers: pick(base.primary_workers, overlay.primary_workers, &d.primary_workers),
        dependency_workers: pick(
            base.dependency_workers,
            overlay.dependency_workers,
            &d.dependency_workers,
        ),
        item_timeout_secs: pick(
            base.item_timeout_secs,
            overlay.item_timeout_secs,
            &d.item_timeout_secs,
        ),
        git_program: pick(base.git_program, overlay.git_program, &d.git_program),
        go_program: pick(base.go_program, overlay.go_program, &d.go_program),
        oracle_program: pick(base.oracle_program, overlay.oracle_program, &d.oracle_program),
        manifest_filename: pick(
            base.manifest_filename,
            overlay.manifest_filename,
            &d.manifest_filename,
        ),
    }
}

fn merge_store(base: StoreConfig, overlay: StoreConfig) -> StoreConfig {
    let d = StoreConfig::default();
    StoreConfig {
        path: pick(base.path, overlay.path, &d.path),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let d = LoggingConfig::default();
    LoggingConfig {
        level: pick(base.level, overlay.level, &d.level),
        format: pick(base.format, overlay.format, &d.format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_local_config(content: &str, dir: &Path) -> PathBuf {
        let config_dir = dir.join(".depgauge");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, DepgaugeConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [store]
            path = "data/repos.db"

            [sizing]
            oracle_program = "/opt/bin/gocloc"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.store.path, PathBuf::from("data/repos.db"));
        assert_eq!(config.sizing.oracle_program, "/opt/bin/gocloc");
        assert_eq!(config.sizing.primary_workers, 20);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"

            [enrichment]
            concurrency = 5
            "#,
        )
        .unwrap();

        create_local_config(
            r#"
            [enrichment]
            concurrency = 8
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.enrichment.concurrency, 8);
        // Not set locally, kept from global
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();

        create_local_config(
            r#"
            [sizing]
            dependency_workers = 10
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let overrides = ConfigOverrides {
            dependency_workers: Some(2),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.sizing.dependency_workers, 2);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = create_local_config("[sizing\nprimary_workers = ", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
            [github]
            default_branch = "main"
            "#,
        )
        .unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&path, None).unwrap();

        assert_eq!(config.github.default_branch, "main");
        assert_eq!(config.github.graphql_url, "https://api.github.com/graphql");
    }

    #[test]
    fn test_init_and_save_local() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();
        assert!(config_path.ends_with(".depgauge/config.toml"));
        let content = std::fs::read_to_string(&config_path).unwrap();
        let _: DepgaugeConfig = toml::from_str(&content).unwrap();

        let mut config = DepgaugeConfig::default();
        config.discovery.count = 250;
        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        assert_eq!(loader.load(temp.path(), None).unwrap().discovery.count, 250);
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), "[http]\nmax_retries = 1\n").unwrap();

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }

    #[test]
    fn test_sourcegraph_token_env_merge() {
        let base = SourcegraphConfig {
            token_env: Some("SRC_TOKEN".to_string()),
            ..Default::default()
        };
        let merged = merge_sourcegraph(base, SourcegraphConfig::default());
        assert_eq!(merged.token_env.as_deref(), Some("SRC_TOKEN"));
    }
}
