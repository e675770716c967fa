//! Run command - every phase in order

use anyhow::Result;
use clap::Args;
use depgauge_config::{ConfigOverrides, DepgaugeConfig};
use serde_json::json;

use super::{create_pipeline, finalize_config, print_failures};
use crate::GlobalOptions;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of search results to request
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the run command
pub async fn execute(args: RunArgs, global: GlobalOptions, config: DepgaugeConfig) -> Result<()> {
    let config = finalize_config(
        config,
        &ConfigOverrides {
            discovery_count: args.count,
            ..Default::default()
        },
    )?;
    let pipeline = create_pipeline(&config)?;

    let report = pipeline.run().await?;

    if args.json {
        let summary = json!({
            "discovered": report.discovery.inserted,
            "duplicates_removed": report.duplicates_removed,
            "enriched": report.enrichment.enriched,
            "enrichment_failed": report.enrichment.failed.len(),
            "primary_measured": report.primary.measured,
            "primary_skipped": report.primary.skipped,
            "primary_failed": report.primary.failed.len(),
            "libraries_recorded": report.libraries.recorded,
            "libraries_skipped": report.libraries.already_sized,
            "libraries_unmeasured": report.libraries.unmeasured,
            "failed_dependencies": report.libraries.failed_dependencies,
            "cancelled": report.primary.cancelled > 0 || report.libraries.cancelled,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Discovered:  {} new", report.discovery.inserted.len());
    println!("Duplicates:  {} removed", report.duplicates_removed);
    println!(
        "Metadata:    {} enriched, {} failed",
        report.enrichment.enriched,
        report.enrichment.failed.len()
    );
    println!(
        "Codebases:   {} measured, {} already sized, {} failed",
        report.primary.measured,
        report.primary.skipped,
        report.primary.failed.len()
    );
    println!(
        "Libraries:   {} recorded, {} already sized, {} unmeasured",
        report.libraries.recorded,
        report.libraries.already_sized,
        report.libraries.unmeasured.len()
    );

    if !global.quiet {
        print_failures(
            "metadata",
            report
                .enrichment
                .failed
                .iter()
                .map(|f| (f.name.as_str(), f.error.as_str())),
        );
        print_failures(
            "codebase",
            report
                .primary
                .failed
                .iter()
                .map(|f| (f.name.as_str(), f.error.as_str())),
        );
    }

    Ok(())
}
