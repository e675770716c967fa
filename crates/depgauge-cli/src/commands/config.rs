//! Config command - View and manage configuration
//!
//! - Write a default local config file
//! - Show the effective configuration
//! - Get one value by dotted key
//! - Show configuration file paths

use anyhow::{Context, Result};
use clap::Subcommand;
use depgauge_config::{ConfigLoader, DepgaugeConfig};
use serde::Serialize;
use std::path::PathBuf;

use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default `.depgauge/config.toml` in the current directory
    Init,

    /// Show the effective configuration
    Show(ShowArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Show configuration file paths
    Path,
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "sizing.dependency_workers")
    pub key: String,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub local: PathBuf,
    pub global_exists: bool,
    pub local_exists: bool,
}

/// Execute the config command
pub async fn execute(
    cmd: ConfigCommand,
    _global: GlobalOptions,
    config: DepgaugeConfig,
) -> Result<()> {
    match cmd {
        ConfigCommand::Init => execute_init(),
        ConfigCommand::Show(args) => execute_show(args, &config),
        ConfigCommand::Get(args) => execute_get(args, &config),
        ConfigCommand::Path => execute_path(),
    }
}

fn execute_init() -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();
    let existed = loader.local_config_path(&root).exists();

    let path = loader
        .init_local(&root)
        .context("Failed to write local config")?;

    if existed {
        println!("Config already exists at {}", path.display());
    } else {
        println!("Wrote default config to {}", path.display());
    }
    Ok(())
}

fn execute_show(args: ShowArgs, config: &DepgaugeConfig) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

fn execute_get(args: GetArgs, config: &DepgaugeConfig) -> Result<()> {
    let value = get_config_value(config, &args.key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    match value {
        serde_json::Value::String(s) => println!("{}", s),
        serde_json::Value::Null => println!("null"),
        other => println!("{}", other),
    }
    Ok(())
}

fn execute_path() -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let global = loader.global_config_path();
    let local = loader.local_config_path(&root);
    let paths = ConfigPaths {
        global_exists: global.as_ref().is_some_and(|p| p.exists()),
        local_exists: local.exists(),
        global,
        local,
    };

    match &paths.global {
        Some(path) => println!("global: {} (exists: {})", path.display(), paths.global_exists),
        None => println!("global: <no home directory>"),
    }
    println!("local:  {} (exists: {})", paths.local.display(), paths.local_exists);
    Ok(())
}

/// Look up a dotted key such as `http.timeout_secs`.
fn get_config_value(config: &DepgaugeConfig, key: &str) -> Option<serde_json::Value> {
    let mut value = serde_json::to_value(config).ok()?;
    for part in key.split('.') {
        value = value.get_mut(part)?.take();
    }
    Some(value)
}
