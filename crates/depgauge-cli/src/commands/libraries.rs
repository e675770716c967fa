//! Libraries command - resolve and measure dependency sets

use anyhow::Result;
use clap::Args;
use depgauge_config::{ConfigOverrides, DepgaugeConfig};

use super::{create_pipeline, finalize_config, print_failures};
use crate::GlobalOptions;

/// Arguments for the libraries command
#[derive(Args, Debug)]
pub struct LibrariesArgs {
    /// Concurrent module download-and-count workers
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Execute the libraries command
pub async fn execute(
    args: LibrariesArgs,
    global: GlobalOptions,
    config: DepgaugeConfig,
) -> Result<()> {
    let config = finalize_config(
        config,
        &ConfigOverrides {
            dependency_workers: args.workers,
            ..Default::default()
        },
    )?;
    let pipeline = create_pipeline(&config)?;

    let report = pipeline.size_libraries().await?;
    println!(
        "Recorded library sizes for {} repositories ({} already sized, {} unmeasured, {} unresolved)",
        report.recorded,
        report.already_sized,
        report.unmeasured.len(),
        report.unresolved.len()
    );
    if report.failed_dependencies > 0 {
        println!(
            "{} dependencies could not be measured and counted as zero",
            report.failed_dependencies
        );
    }
    if report.cancelled {
        println!("Cancelled before every repository was processed");
    }
    if !global.quiet {
        print_failures(
            "unresolved",
            report
                .unresolved
                .iter()
                .map(|f| (f.name.as_str(), f.error.as_str())),
        );
    }

    Ok(())
}
