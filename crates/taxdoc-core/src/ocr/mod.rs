//! OCR backends and the adapter that chains them.

mod adapter;
#[cfg(feature = "native")]
mod neural;
mod preprocessing;
mod readiness;
mod scripted;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use adapter::{OcrAdapter, OcrAdapterBuilder, Recognized};
#[cfg(feature = "native")]
pub use neural::NeuralOcr;
pub use preprocessing::ImagePreprocessor;
pub use readiness::{EngineGate, EngineStatus};
pub use scripted::ScriptedOcr;
#[cfg(feature = "tesseract")]
pub use tesseract::TesseractOcr;

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::PageSegmentation;
use crate::models::document::ExtractionMethod;

/// Family an OCR backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// Deep-learning detector + recognizer.
    Neural,
    /// Tesseract-style engine with configurable segmentation.
    Traditional,
}

impl OcrEngineKind {
    /// Extraction method reported when this engine produced the text.
    pub fn method(&self) -> ExtractionMethod {
        match self {
            Self::Neural => ExtractionMethod::NeuralOcr,
            Self::Traditional => ExtractionMethod::TraditionalOcr,
        }
    }
}

impl fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Neural => f.write_str("neural"),
            Self::Traditional => f.write_str("traditional"),
        }
    }
}

/// One recognition attempt's engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionPass {
    /// Engine defaults.
    Default,
    /// Alternate engine mode, tried once after an empty default pass.
    Alternate,
    /// Explicit page-segmentation policy.
    Segmentation(PageSegmentation),
}

impl fmt::Display for RecognitionPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Alternate => f.write_str("alternate"),
            Self::Segmentation(seg) => write!(f, "psm {}", seg.psm()),
        }
    }
}

/// Abstraction over an OCR backend.
///
/// Implementations receive an already preprocessed image. Backends without
/// tunable passes ignore `pass`.
pub trait OcrBackend: Send + Sync {
    /// Engine family.
    fn kind(&self) -> OcrEngineKind;

    /// Recognize text in `image`.
    fn recognize(&self, image: &DynamicImage, pass: RecognitionPass) -> Result<String, OcrError>;
}
