//! CLI application for estimating tax liability from scanned tax documents.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, estimate, inspect, issuers};

/// taxdoc - Estimate income tax from W-2, 1099, 1098 and K-1 documents
#[derive(Parser)]
#[command(name = "taxdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a set of tax documents and estimate the refund or amount owed
    Estimate(estimate::EstimateArgs),

    /// Show how a single document is read, classified and extracted
    Inspect(inspect::InspectArgs),

    /// Validate and test issuer-override tables
    Issuers(issuers::IssuersArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Estimate(args) => estimate::run(args, cli.config.as_deref()).await,
        Commands::Inspect(args) => inspect::run(args, cli.config.as_deref()).await,
        Commands::Issuers(args) => issuers::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}
