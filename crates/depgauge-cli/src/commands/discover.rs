//! Discover command - add candidate repositories to the store

use anyhow::Result;
use clap::Args;
use depgauge_config::{ConfigOverrides, DepgaugeConfig};

use super::{create_pipeline, finalize_config, print_info};
use crate::GlobalOptions;

/// Arguments for the discover command
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Number of search results to request
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Also remove duplicate records afterwards
    #[arg(long)]
    pub dedup: bool,
}

/// Execute the discover command
pub async fn execute(
    args: DiscoverArgs,
    global: GlobalOptions,
    config: DepgaugeConfig,
) -> Result<()> {
    let config = finalize_config(
        config,
        &ConfigOverrides {
            discovery_count: args.count,
            ..Default::default()
        },
    )?;
    let pipeline = create_pipeline(&config)?;

    let report = pipeline.discover().await?;
    println!(
        "Discovered {} new repositories ({} already stored, {} not on GitHub)",
        report.inserted.len(),
        report.existing,
        report.invalid.len()
    );
    for name in &report.inserted {
        print_info(&format!("  + {}", name), global.quiet);
    }

    if args.dedup {
        let removed = pipeline.dedup()?;
        println!("Removed {} duplicate records", removed);
    }

    Ok(())
}
