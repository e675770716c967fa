//! depgauge CLI - Go repository discovery, enrichment and sizing
//!
//! # Usage
//!
//! ```bash
//! # Run every phase against the configured store
//! depgauge run
//!
//! # Individual phases
//! depgauge discover --count 50
//! depgauge enrich
//! depgauge size --workers 8
//! depgauge libraries
//!
//! # Inspect results
//! depgauge records list --json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use depgauge_config::{ConfigOverrides, DepgaugeConfig, LogFormat};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// depgauge - Measure Go repositories and their dependency sets
#[derive(Parser, Debug)]
#[command(name = "depgauge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "DEPGAUGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Repository store (SQLite database file)
    #[arg(long, global = true, env = "DEPGAUGE_STORE")]
    store: Option<PathBuf>,

    /// Scratch directory for clones and module downloads
    #[arg(long, global = true, env = "DEPGAUGE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DEPGAUGE_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            store_path: self.store.clone(),
            scratch_dir: self.scratch_dir.clone(),
            log_level: self.log_level.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find candidate repositories and add them to the store
    Discover(commands::discover::DiscoverArgs),

    /// Remove records that share a name
    Dedup(commands::dedup::DedupArgs),

    /// Fetch repository metadata for every record
    Enrich(commands::enrich::EnrichArgs),

    /// Measure each repository's own codebase
    Size(commands::size::SizeArgs),

    /// Resolve and measure each repository's dependency set
    Libraries(commands::libraries::LibrariesArgs),

    /// Run every phase in order
    Run(commands::run::RunArgs),

    /// Inspect and reset stored records
    #[command(subcommand)]
    Records(commands::records::RecordsCommand),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Pick the log level from flags, falling back to configuration.
fn log_level(global: &GlobalOptions, config: &DepgaugeConfig) -> Level {
    if global.quiet {
        Level::ERROR
    } else if global.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    }
}

fn init_logging(global: &GlobalOptions, config: &DepgaugeConfig) -> Result<()> {
    let level = log_level(global, config);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    if global.json_logs || config.logging.format == LogFormat::Json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&cli.global)?;
    init_logging(&cli.global, &config)?;

    match cli.command {
        Commands::Discover(args) => commands::discover::execute(args, cli.global, config).await,
        Commands::Dedup(args) => commands::dedup::execute(args, cli.global, config).await,
        Commands::Enrich(args) => commands::enrich::execute(args, cli.global, config).await,
        Commands::Size(args) => commands::size::execute(args, cli.global, config).await,
        Commands::Libraries(args) => commands::libraries::execute(args, cli.global, config).await,
        Commands::Run(args) => commands::run::execute(args, cli.global, config).await,
        Commands::Records(cmd) => commands::records::execute(cmd, cli.global, config).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global, config).await,
    }
}
