//! Records command - inspect and reset stored repositories

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use depgauge_config::{ConfigOverrides, DepgaugeConfig};
use depgauge_core::{RepositoryRecord, SizeField};

use super::{finalize_config, open_store};
use crate::GlobalOptions;

/// Record inspection commands
#[derive(Subcommand, Debug)]
pub enum RecordsCommand {
    /// List stored repositories
    List(ListArgs),

    /// Clear a size measurement so the next run repeats it
    Reset(ResetArgs),
}

/// Arguments for the list command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Which measurement to clear
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetField {
    Original,
    Library,
    All,
}

impl ResetField {
    fn fields(self) -> &'static [SizeField] {
        match self {
            ResetField::Original => &[SizeField::Original],
            ResetField::Library => &[SizeField::Library],
            ResetField::All => &[SizeField::Original, SizeField::Library],
        }
    }
}

/// Arguments for the reset command
#[derive(clap::Args, Debug)]
pub struct ResetArgs {
    /// Repository name (`owner/repo`)
    pub name: String,

    /// Measurement to clear
    #[arg(long, value_enum, default_value = "all")]
    pub field: ResetField,
}

/// Execute the records command
pub async fn execute(
    cmd: RecordsCommand,
    _global: GlobalOptions,
    config: DepgaugeConfig,
) -> Result<()> {
    let config = finalize_config(config, &ConfigOverrides::default())?;
    match cmd {
        RecordsCommand::List(args) => execute_list(args, &config),
        RecordsCommand::Reset(args) => execute_reset(args, &config),
    }
}

fn execute_list(args: ListArgs, config: &DepgaugeConfig) -> Result<()> {
    let store = open_store(config)?;
    let records = store.all()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No repositories stored");
        return Ok(());
    }

    println!(
        "{:<6} {:<40} {:>8} {:>12} {:>12}",
        "ID", "NAME", "STARS", "ORIGINAL", "LIBRARY"
    );
    for record in &records {
        println!(
            "{:<6} {:<40} {:>8} {:>12} {:>12}",
            record.id,
            record.name,
            display(&record.stargazer_count),
            display(record.size_field(SizeField::Original)),
            display(record.size_field(SizeField::Library)),
        );
    }

    Ok(())
}

fn execute_reset(args: ResetArgs, config: &DepgaugeConfig) -> Result<()> {
    let store = open_store(config)?;
    let record: RepositoryRecord = store
        .find_by_name(&args.name)?
        .with_context(|| format!("Repository not found: {}", args.name))?;

    for field in args.field.fields() {
        store.clear_size(record.id, *field)?;
        println!("Cleared {} size of {}", field, record.name);
    }

    Ok(())
}

fn display(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
