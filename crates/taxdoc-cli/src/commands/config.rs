//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use taxdoc_core::{IssuerTable, TaxdocConfig};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "pdf.min_text_chars")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value (JSON, or a bare string)
        value: String,
    },

    /// Check the configuration and the files it points at
    Validate,

    /// Show configuration file path
    Path,
}

/// Location used when no `--config` is given.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taxdoc")
        .join("config.json")
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path.map_or_else(default_config_path, PathBuf::from);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init { force } => init_config(&path, force),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Validate => validate_config(&path),
        ConfigCommand::Path => show_path(&path),
    }
}

fn load_or_default(path: &Path) -> anyhow::Result<TaxdocConfig> {
    if path.exists() {
        Ok(TaxdocConfig::from_file(path)?)
    } else {
        Ok(TaxdocConfig::default())
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }
    let config = load_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    TaxdocConfig::default().save(path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

fn get_config(path: &Path, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(load_or_default(path)?)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }

    println!("{}", serde_json::to_string_pretty(current)?);
    Ok(())
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = load_or_default(path)?;
    let parsed: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };

    let mut current = &mut json;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .get_mut(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }
    let Some(object) = current.as_object_mut() else {
        anyhow::bail!("Cannot set value at non-object path: {}", key);
    };
    if !object.contains_key(leaf) {
        anyhow::bail!("Configuration key not found: {}", key);
    }
    object.insert(leaf.to_string(), parsed.clone());

    // Round-trip through the typed config so bad values are rejected
    let config: TaxdocConfig = serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    config.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed)?
    );
    Ok(())
}

fn validate_config(path: &Path) -> anyhow::Result<()> {
    let config = load_or_default(path)?;
    let mut problems = 0;

    if config.submission.max_concurrent_documents == 0 {
        println!(
            "{} submission.max_concurrent_documents must be at least 1",
            style("✗").red()
        );
        problems += 1;
    }

    for (field, range) in &config.extraction.bounds {
        if range.min > range.max {
            println!(
                "{} extraction bounds for {} are inverted ({} > {})",
                style("✗").red(),
                field,
                range.min,
                range.max
            );
            problems += 1;
        }
    }

    if config.models.is_complete() {
        println!(
            "{} Neural OCR models found in {}",
            style("✓").green(),
            config.models.model_dir.display()
        );
    } else {
        println!(
            "{} Neural OCR models not found in {}",
            style("!").yellow(),
            config.models.model_dir.display()
        );
    }

    if let Some(table) = &config.issuers.table {
        match IssuerTable::load(table) {
            Ok(issuers) => println!(
                "{} Issuer table {} ({} entries)",
                style("✓").green(),
                table.display(),
                issuers.len()
            ),
            Err(e) => {
                println!("{} Issuer table {}: {}", style("✗").red(), table.display(), e);
                problems += 1;
            }
        }
    }

    if problems > 0 {
        anyhow::bail!("{} configuration problem(s) found", problems);
    }
    println!("{} Configuration is valid", style("✓").green());
    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'taxdoc config init' to create a configuration file.");
    }
    Ok(())
}
