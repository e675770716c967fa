//! Dedup command - remove records that share a name

use anyhow::Result;
use clap::Args;
use depgauge_config::{ConfigOverrides, DepgaugeConfig};
use depgauge_pipeline::remove_duplicates;

use super::{finalize_config, open_store};
use crate::GlobalOptions;

/// Arguments for the dedup command
#[derive(Args, Debug)]
pub struct DedupArgs {}

/// Execute the dedup command
pub async fn execute(
    _args: DedupArgs,
    _global: GlobalOptions,
    config: DepgaugeConfig,
) -> Result<()> {
    let config = finalize_config(config, &ConfigOverrides::default())?;
    let store = open_store(&config)?;

    let removed = remove_duplicates(&*store)?;
    println!("Removed {} duplicate records", removed);

    Ok(())
}
