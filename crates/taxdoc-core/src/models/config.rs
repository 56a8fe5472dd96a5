//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tax::FieldName;

/// Main configuration for the taxdoc pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxdocConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Neural model configuration.
    pub models: ModelConfig,

    /// Issuer-override table location.
    pub issuers: IssuerConfig,

    /// Submission processing configuration.
    pub submission: SubmissionConfig,
}

/// Page-segmentation policy for the traditional OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegmentation {
    /// Fully automatic layout analysis.
    Auto,
    /// A single uniform block of text.
    SingleBlock,
    /// A single column of variable-size text.
    SingleColumn,
    /// A single word.
    SingleWord,
    /// As much text as possible in no particular order.
    SparseText,
}

impl PageSegmentation {
    /// Tesseract `--psm` number.
    pub fn psm(&self) -> u8 {
        match self {
            Self::Auto => 3,
            Self::SingleColumn => 4,
            Self::SingleBlock => 6,
            Self::SingleWord => 8,
            Self::SparseText => 11,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Images with a side longer than this are downscaled before recognition.
    pub max_image_dimension: u32,

    /// Tighter bound applied to rasterized PDF pages before neural OCR.
    pub neural_max_dimension: u32,

    /// Segmentation policies tried, in order, when the traditional engine
    /// returns nothing in its default and alternate modes.
    pub segmentation_fallbacks: Vec<PageSegmentation>,

    /// Tesseract language code(s), e.g. `eng`.
    pub tesseract_language: String,

    /// Directory containing `*.traineddata` (system default when unset).
    pub tessdata_dir: Option<PathBuf>,

    /// Replace `[UNK]` tokens emitted by the neural recognizer with spaces.
    pub strip_unknown_tokens: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 3000,
            neural_max_dimension: 2500,
            segmentation_fallbacks: vec![
                PageSegmentation::SingleBlock,
                PageSegmentation::SingleColumn,
                PageSegmentation::SingleWord,
            ],
            tesseract_language: "eng".to_string(),
            tessdata_dir: None,
            strip_unknown_tokens: true,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rasterizing PDF pages before OCR.
    pub render_dpi: u32,

    /// Native text must have more than this many non-whitespace characters
    /// to count as meaningful.
    pub min_text_chars: usize,

    /// Maximum pages sent through the neural engine.
    pub neural_page_cap: usize,

    /// Maximum pages sent through the traditional engine.
    pub traditional_page_cap: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 200,
            min_text_chars: 50,
            neural_page_cap: 10,
            traditional_page_cap: 5,
        }
    }
}

/// Inclusive numeric interval a field value must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl AmountRange {
    pub fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Field extraction configuration.
///
/// The bounds are tuning knobs for rejecting OCR misreads, not tax rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Per-field plausibility bounds.
    pub bounds: BTreeMap<FieldName, AmountRange>,

    /// Bounds for fields not listed in `bounds`.
    pub default_bounds: AmountRange,

    /// Withheld tax may not exceed this fraction of the document's primary
    /// amount.
    pub withheld_max_fraction: Decimal,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let mut bounds = BTreeMap::new();
        bounds.insert(
            FieldName::Wages,
            AmountRange::new(Decimal::from(100), Decimal::from(1_000_000)),
        );
        bounds.insert(
            FieldName::MortgageInterest,
            AmountRange::new(Decimal::from(100), Decimal::from(100_000)),
        );
        Self {
            bounds,
            default_bounds: AmountRange::new(Decimal::ZERO, Decimal::from(10_000_000)),
            withheld_max_fraction: Decimal::new(5, 1),
        }
    }
}

impl ExtractionConfig {
    /// Bounds that apply to `field`.
    pub fn bounds_for(&self, field: FieldName) -> AmountRange {
        self.bounds.get(&field).copied().unwrap_or(self.default_bounds)
    }
}

/// Neural OCR model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// True when every model file is present.
    pub fn is_complete(&self) -> bool {
        [&self.detection_model, &self.recognition_model, &self.dictionary]
            .iter()
            .all(|name| self.model_dir.join(name).exists())
    }
}

/// Issuer-override table location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// JSON file with issuer overrides. No overrides when unset.
    pub table: Option<PathBuf>,
}

/// Submission processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Documents extracted concurrently.
    pub max_concurrent_documents: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: 4,
        }
    }
}

impl TaxdocConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
