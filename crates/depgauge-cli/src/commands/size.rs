//! Size command - measure each repository's own codebase

use anyhow::Result;
use clap::Args;
use depgauge_config::{ConfigOverrides, DepgaugeConfig};

use super::{create_pipeline, finalize_config, print_failures};
use crate::GlobalOptions;

/// Arguments for the size command
#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Concurrent clone-and-count workers
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Execute the size command
pub async fn execute(args: SizeArgs, global: GlobalOptions, config: DepgaugeConfig) -> Result<()> {
    let config = finalize_config(
        config,
        &ConfigOverrides {
            primary_workers: args.workers,
            ..Default::default()
        },
    )?;
    let pipeline = create_pipeline(&config)?;

    let report = pipeline.size_primary().await?;
    println!(
        "Measured {} repositories ({} already sized, {} failed, {} cancelled)",
        report.measured,
        report.skipped,
        report.failed.len(),
        report.cancelled
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
