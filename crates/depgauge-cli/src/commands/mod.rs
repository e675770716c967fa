//! CLI command implementations

pub mod config;
pub mod dedup;
pub mod discover;
pub mod enrich;
pub mod libraries;
pub mod records;
pub mod run;
pub mod size;

use std::sync::Arc;

use anyhow::{Context, Result};
use depgauge_config::{ConfigLoader, ConfigOverrides, DepgaugeConfig};
use depgauge_core::{RepositoryStore, SqliteStore};
use depgauge_pipeline::EnrichmentPipeline;
use tracing::warn;

use crate::GlobalOptions;

/// Load configuration with optional config file override.
pub fn load_config(global: &GlobalOptions) -> Result<DepgaugeConfig> {
    let overrides = global.to_config_overrides();
    let mut loader = ConfigLoader::new();

    let config = if let Some(ref config_path) = global.config {
        loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        let root = std::env::current_dir().context("Failed to get current directory")?;
        loader
            .load(&root, Some(&overrides))
            .context("Failed to load configuration")?
    };

    Ok(config)
}

/// Apply command-specific overrides and validate the result.
pub fn finalize_config(
    mut config: DepgaugeConfig,
    overrides: &ConfigOverrides,
) -> Result<DepgaugeConfig> {
    config.apply_overrides(overrides);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open the configured SQLite store.
pub fn open_store(config: &DepgaugeConfig) -> Result<Arc<dyn RepositoryStore>> {
    let store = SqliteStore::open(&config.store.path)
        .with_context(|| format!("Failed to open store {}", config.store.path.display()))?;
    Ok(Arc::new(store))
}

/// Open the store and wire a pipeline from configuration.
///
/// Ctrl-C cancels the pipeline: no new sizing items start, in-flight ones
/// drain.
pub fn create_pipeline(config: &DepgaugeConfig) -> Result<EnrichmentPipeline> {
    let store = open_store(config)?;
    let pipeline =
        EnrichmentPipeline::from_config(config, store).context("Failed to create pipeline")?;

    let token = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight work");
            token.cancel();
        }
    });

    Ok(pipeline)
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

/// Print one `name: error` line per failure.
pub fn print_failures<'a>(label: &str, failures: impl IntoIterator<Item = (&'a str, &'a str)>) {
    for (name, error) in failures {
        eprintln!("{} {}: {}", label, name, error);
    }
}
