//! Enrich command - fetch repository metadata

use anyhow::Result;
use clap::Args;
use depgauge_config::{ConfigOverrides, DepgaugeConfig};

use super::{create_pipeline, finalize_config, print_failures};
use crate::GlobalOptions;

/// Arguments for the enrich command
#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Maximum metadata queries in flight
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Execute the enrich command
pub async fn execute(
    args: EnrichArgs,
    global: GlobalOptions,
    config: DepgaugeConfig,
) -> Result<()> {
    let config = finalize_config(
        config,
        &ConfigOverrides {
            concurrency: args.concurrency,
            ..Default::default()
        },
    )?;
    let pipeline = create_pipeline(&config)?;

    let report = pipeline.enrich().await?;
    println!(
        "Enriched {} repositories ({} failed, {} skipped)",
        report.enriched,
        report.failed.len(),
        report.skipped.len()
    );
    if !global.quiet {
        print_failures(
            "failed",
            report
                .failed
                .iter()
                .map(|f| (f.name.as_str(), f.error.as_str())),
        );
    }

    Ok(())
}
