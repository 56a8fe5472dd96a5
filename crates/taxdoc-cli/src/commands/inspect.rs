//! Inspect command - show how one document is read and interpreted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use console::style;
use serde::Serialize;

use taxdoc_core::models::document::ExtractionMethod;
use taxdoc_core::{
    DocumentType, FieldExtraction, RawDocument, SubmissionProcessor, SubmittedFile,
};

use super::estimate::OutputFormat;
use super::setup::{self, EngineArgs};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Include the extracted text in the output
    #[arg(long)]
    show_text: bool,

    #[command(flatten)]
    engines: EngineArgs,
}

#[derive(Serialize)]
struct Inspection<'a> {
    file: &'a str,
    method: ExtractionMethod,
    elapsed_ms: u128,
    pages_ocred: usize,
    #[serde(flatten)]
    extraction: &'a FieldExtraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = setup::load_config(config_path)?;
    setup::apply_overrides(&mut config, &args.engines);

    let file = SubmittedFile::from_path(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let Some(kind) = file.kind() else {
        anyhow::bail!("Unsupported file format: {}", file.extension);
    };

    let ocr = setup::build_ocr(&config, &args.engines).await?;
    let processor = SubmissionProcessor::from_config(Arc::new(ocr), &config)?;

    let document = RawDocument::new(file.name.clone(), kind, file.bytes);
    let analyzed = tokio::task::spawn_blocking(move || processor.analyze(&document)).await?;
    let (text, extraction) = match analyzed {
        Ok(result) => result,
        Err(failure) => anyhow::bail!(
            "Failed to extract text from {}: {} ({})",
            file.name,
            failure.kind,
            failure.message
        ),
    };

    match args.format {
        OutputFormat::Json => {
            let inspection = Inspection {
                file: &file.name,
                method: text.method,
                elapsed_ms: text.elapsed.as_millis(),
                pages_ocred: text.pages_ocred,
                extraction: &extraction,
                text: args.show_text.then_some(text.text.as_str()),
            };
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
        OutputFormat::Text => {
            println!("{} {}", style("File:").bold(), file.name);
            println!(
                "{} {} in {:.2}s ({} page(s) through OCR)",
                style("Text:").bold(),
                text.method,
                text.elapsed.as_secs_f64(),
                text.pages_ocred
            );
            let doc_type = match extraction.document_type {
                DocumentType::Unclassified => style("not recognized".to_string()).yellow(),
                other => style(other.to_string()).green(),
            };
            println!("{} {}", style("Type:").bold(), doc_type);
            if let Some(issuer) = &extraction.issuer {
                println!("{} {}", style("Issuer override:").bold(), issuer);
            }
            if let Some(name) = &extraction.individual {
                println!("{} {}", style("Recipient:").bold(), name);
            }

            println!();
            for (field, value) in &extraction.fields {
                println!("  {} {:<28} {}", style("✓").green(), field.label(), value);
            }
            for field in &extraction.misses {
                println!("  {} {:<28} not found", style("✗").red(), field.label());
            }

            if args.show_text {
                println!();
                println!("{}", style("Extracted text:").bold());
                println!("{}", text.text);
            }
        }
    }

    Ok(())
}
