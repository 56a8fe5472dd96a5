//! Issuers command - validate issuer-override tables and try them on files.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;

use taxdoc_core::tax::issuers::{IssuerEntry, IssuerFieldRule};
use taxdoc_core::{IssuerTable, RawDocument, SubmissionProcessor, SubmittedFile};

use super::setup::{self, EngineArgs};

/// Arguments for the issuers command.
#[derive(Args)]
pub struct IssuersArgs {
    #[command(subcommand)]
    command: IssuersCommand,
}

#[derive(Subcommand)]
enum IssuersCommand {
    /// Compile a table and list its entries
    Check {
        /// Issuer table (JSON)
        table: PathBuf,
    },

    /// Report which entry, if any, applies to a document
    Match {
        /// Issuer table (JSON)
        table: PathBuf,

        /// Input file (PDF or image)
        input: PathBuf,

        #[command(flatten)]
        engines: EngineArgs,
    },
}

pub async fn run(args: IssuersArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        IssuersCommand::Check { table } => check_table(table),
        IssuersCommand::Match {
            table,
            input,
            engines,
        } => match_document(table, input, engines, config_path).await,
    }
}

fn check_table(path: PathBuf) -> anyhow::Result<()> {
    let table = IssuerTable::load(&path)
        .with_context(|| format!("Invalid issuer table {}", path.display()))?;

    println!(
        "{} {} entries in {}",
        style("✓").green(),
        table.len(),
        path.display()
    );
    for entry in table.entries() {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &IssuerEntry) {
    let mode = if entry.fallback_only {
        "fallback"
    } else {
        "override"
    };
    println!();
    println!(
        "  {} ({}, {})",
        style(&entry.name).bold(),
        entry.forced_type,
        mode
    );
    println!("    signatures: {}", entry.signatures.join(", "));
    for (field, rule) in &entry.fields {
        println!("    {:<26} {}", field.label(), describe_rule(rule));
    }
}

fn describe_rule(rule: &IssuerFieldRule) -> String {
    let mut out = format!("{} strategies", rule.strategies.len());
    match (rule.min, rule.max) {
        (Some(min), Some(max)) => out.push_str(&format!(", range {}..{}", min, max)),
        (Some(min), None) => out.push_str(&format!(", at least {}", min)),
        (None, Some(max)) => out.push_str(&format!(", at most {}", max)),
        (None, None) => {}
    }
    out
}

async fn match_document(
    table: PathBuf,
    input: PathBuf,
    engines: EngineArgs,
    config_path: Option<&str>,
) -> anyhow::Result<()> {
    let mut config = setup::load_config(config_path)?;
    setup::apply_overrides(&mut config, &engines);
    config.issuers.table = Some(table);

    let file = SubmittedFile::from_path(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let Some(kind) = file.kind() else {
        anyhow::bail!("Unsupported file format: {}", file.extension);
    };

    let ocr = setup::build_ocr(&config, &engines).await?;
    let processor = SubmissionProcessor::from_config(Arc::new(ocr), &config)?;

    let document = RawDocument::new(file.name.clone(), kind, file.bytes);
    let analyzed = tokio::task::spawn_blocking(move || processor.analyze(&document)).await?;
    let (_, extraction) = analyzed.map_err(|failure| {
        anyhow::anyhow!(
            "Failed to extract text from {}: {} ({})",
            file.name,
            failure.kind,
            failure.message
        )
    })?;

    println!("{} {}", style("Type:").bold(), extraction.document_type);
    match &extraction.issuer {
        Some(name) => println!("{} {}", style("Issuer:").bold(), style(name).green()),
        None => println!("{} {}", style("Issuer:").bold(), style("no entry applies").yellow()),
    }
    for (field, value) in &extraction.fields {
        println!("  {:<28} {}", field.label(), value);
    }
    Ok(())
}
