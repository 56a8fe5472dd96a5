//! Shared command setup: configuration loading and OCR engine wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use taxdoc_core::{EngineGate, EngineStatus, OcrAdapter, OcrBackend, TaxdocConfig};

use super::config::default_config_path;

/// Options that decide which engines and overrides a run uses.
#[derive(Args, Clone)]
pub struct EngineArgs {
    /// Directory with neural OCR model files
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Issuer-override table (JSON)
    #[arg(long)]
    pub issuers: Option<PathBuf>,

    /// Skip OCR and use only PDF text layers
    #[arg(long)]
    pub text_only: bool,

    /// Wait for the neural OCR engine to finish loading before processing
    #[arg(long)]
    pub wait_neural: bool,
}

/// Load the config from `config_path`, else the default location, else
/// built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TaxdocConfig> {
    if let Some(path) = config_path {
        return Ok(TaxdocConfig::from_file(Path::new(path))?);
    }
    let path = default_config_path();
    if path.exists() {
        debug!("Using config file {}", path.display());
        Ok(TaxdocConfig::from_file(&path)?)
    } else {
        Ok(TaxdocConfig::default())
    }
}

/// Apply command-line overrides to `config`.
pub fn apply_overrides(config: &mut TaxdocConfig, args: &EngineArgs) {
    if let Some(dir) = &args.model_dir {
        config.models.model_dir = dir.clone();
    }
    if let Some(table) = &args.issuers {
        config.issuers.table = Some(table.clone());
    }
}

/// Build the OCR adapter for this run, optionally waiting on the neural
/// engine.
pub async fn build_ocr(config: &TaxdocConfig, args: &EngineArgs) -> anyhow::Result<OcrAdapter> {
    if args.text_only {
        return Ok(OcrAdapter::disabled());
    }

    let mut builder = OcrAdapter::builder().with_config(&config.ocr);
    if let Some(gate) = neural_gate(config) {
        builder = builder.with_neural(gate);
    }
    if let Some(engine) = traditional_engine(config) {
        builder = builder.with_traditional(engine);
    }
    let adapter = builder.build();

    if !adapter.has_engines() {
        warn!("No OCR engine available; only PDF text layers will be read");
    }

    if args.wait_neural {
        if let Some(gate) = adapter.neural_gate() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.set_message("Loading neural OCR models...");
            pb.enable_steady_tick(Duration::from_millis(100));
            let status = gate.wait().await;
            pb.finish_and_clear();
            if let EngineStatus::Unavailable(reason) = status {
                eprintln!(
                    "{} Neural OCR unavailable ({}), continuing without it",
                    style("!").yellow(),
                    reason
                );
            }
        }
    }

    Ok(adapter)
}

#[cfg(feature = "native")]
fn neural_gate(config: &TaxdocConfig) -> Option<EngineGate> {
    use taxdoc_core::NeuralOcr;

    let models = config.models.clone();
    if !models.is_complete() {
        debug!("Neural OCR models not found in {}", models.model_dir.display());
        return Some(EngineGate::unavailable(format!(
            "models not found in {}",
            models.model_dir.display()
        )));
    }
    let strip = config.ocr.strip_unknown_tokens;
    Some(EngineGate::spawn(move || {
        let engine: Arc<dyn OcrBackend> = Arc::new(NeuralOcr::load(&models, strip)?);
        Ok(engine)
    }))
}

#[cfg(not(feature = "native"))]
fn neural_gate(_config: &TaxdocConfig) -> Option<EngineGate> {
    None
}

#[cfg(feature = "tesseract")]
fn traditional_engine(config: &TaxdocConfig) -> Option<Arc<dyn OcrBackend>> {
    use taxdoc_core::TesseractOcr;

    let engine = TesseractOcr::from_config(&config.ocr);
    match engine.check_language_data() {
        Ok(()) => Some(Arc::new(engine)),
        Err(e) => {
            warn!("Tesseract unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "tesseract"))]
fn traditional_engine(_config: &TaxdocConfig) -> Option<Arc<dyn OcrBackend>> {
    None
}
