//! Estimate command - process a whole submission into a tax summary.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use taxdoc_core::models::profile::{DeductionCategory, DeductionElection, IncomeCategory};
use taxdoc_core::{FilingStatus, SubmissionProcessor, SubmittedFile, SummaryRecord};

use super::setup::{self, EngineArgs};

/// Arguments for the estimate command.
#[derive(Args)]
pub struct EstimateArgs {
    /// Input files (PDF or image)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Filing status: single, married_jointly, married_separate, head_household
    #[arg(short, long, default_value = "single")]
    status: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Number of documents processed in parallel
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    #[command(flatten)]
    engines: EngineArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: EstimateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = setup::load_config(config_path)?;
    setup::apply_overrides(&mut config, &args.engines);
    if let Some(jobs) = args.jobs {
        config.submission.max_concurrent_documents = jobs;
    }

    // Reject a bad status before touching any file
    let status: FilingStatus = args.status.parse()?;

    let files = args
        .inputs
        .iter()
        .map(|path| {
            SubmittedFile::from_path(path)
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let ocr = setup::build_ocr(&config, &args.engines).await?;
    let processor = SubmissionProcessor::from_config(Arc::new(ocr), &config)?;

    info!("Estimating from {} file(s)", files.len());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(format!("Processing {} document(s)...", files.len()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = processor.process_with_status(files, status).await;
    pb.finish_and_clear();
    let summary = result?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
        OutputFormat::Text => format_text(&summary)?,
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn income_label(category: IncomeCategory) -> &'static str {
    match category {
        IncomeCategory::Wages => "Wages",
        IncomeCategory::Interest => "Interest",
        IncomeCategory::Dividends => "Dividends",
        IncomeCategory::CapitalGains => "Capital gains",
        IncomeCategory::OtherIncome => "Other income",
    }
}

fn deduction_label(category: DeductionCategory) -> &'static str {
    match category {
        DeductionCategory::Charity => "Charity",
        DeductionCategory::Medical => "Medical",
        DeductionCategory::MortgageInterest => "Mortgage interest",
        DeductionCategory::OtherDeduction => "Other",
    }
}

fn format_text(summary: &SummaryRecord) -> anyhow::Result<String> {
    let mut out = String::new();

    writeln!(out, "Tax estimate ({})", summary.filing_status)?;
    writeln!(out, "Generated: {}", chrono::Local::now().format("%Y-%m-%d %H:%M"))?;
    if !summary.individuals.is_empty() {
        writeln!(out, "Individuals: {}", summary.individuals.join(", "))?;
    }
    writeln!(out)?;

    writeln!(out, "Income:")?;
    for (category, amount) in &summary.income {
        writeln!(out, "  {:<20} {:>14}", income_label(*category), amount)?;
    }
    writeln!(out, "  {:<20} {:>14}", "Total", summary.total_income)?;
    writeln!(out)?;

    writeln!(out, "Itemized deductions:")?;
    for (category, amount) in &summary.deductions {
        writeln!(out, "  {:<20} {:>14}", deduction_label(*category), amount)?;
    }
    writeln!(out, "  {:<20} {:>14}", "Total", summary.itemized_deductions)?;
    writeln!(out)?;

    let election = match summary.deduction_election {
        DeductionElection::Standard => "standard",
        DeductionElection::Itemized => "itemized",
    };
    writeln!(out, "Deduction ({}):    {}", election, summary.total_deductions)?;
    writeln!(out, "Taxable income:        {}", summary.taxable_income)?;
    writeln!(out, "Tax:                   {} ({})", summary.tax, summary.tax_rate)?;
    writeln!(out, "Tax withheld:          {}", summary.tax_withheld)?;
    if summary.is_refund {
        writeln!(out, "Refund:                {}", summary.refund_or_owed)?;
    } else {
        writeln!(out, "Amount owed:           {}", summary.refund_or_owed)?;
    }

    if !summary.warnings().is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in summary.warnings() {
            writeln!(out, "  - {}", warning)?;
        }
    }

    Ok(out)
}
