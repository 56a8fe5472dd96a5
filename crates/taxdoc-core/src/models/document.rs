//! Per-document data: the raw upload, the text extracted from it, and its
//! detected type.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Declared kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Raster image (PNG, JPEG, ...).
    Image,
}

impl DocumentKind {
    /// Map a file extension (with or without the leading dot) to a kind.
    ///
    /// Returns `None` for unsupported extensions.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

/// An uploaded file. Immutable once received.
#[derive(Debug, Clone)]
pub struct RawDocument {
    name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, kind: DocumentKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Strategy that produced a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded PDF text layer.
    NativePdfText,
    /// Neural OCR engine.
    NeuralOcr,
    /// Traditional (Tesseract-style) OCR engine.
    TraditionalOcr,
    /// No strategy ran.
    None,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NativePdfText => "native PDF text",
            Self::NeuralOcr => "neural OCR",
            Self::TraditionalOcr => "traditional OCR",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// Text successfully obtained from a document.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Plain text, pages separated by form feeds.
    pub text: String,
    /// Strategy that produced the text.
    pub method: ExtractionMethod,
    /// Wall-clock time spent extracting.
    pub elapsed: Duration,
    /// Number of pages (or images) that went through OCR.
    pub pages_ocred: usize,
}

/// Coarse classification of an extraction failure. Surfaced to users, so it
/// carries no internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The bytes could not be decoded as the declared kind.
    Undecodable,
    /// Every strategy ran and none produced text.
    NoText,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undecodable => f.write_str("file could not be decoded"),
            Self::NoText => f.write_str("no readable text found"),
        }
    }
}

/// Terminal failure marker for a document.
#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub kind: FailureKind,
    /// Internal detail; logged, never shown to users.
    pub message: String,
    /// Last strategy attempted before giving up.
    pub last_method: ExtractionMethod,
}

impl ExtractionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, last_method: ExtractionMethod) -> Self {
        Self {
            kind,
            message: message.into(),
            last_method,
        }
    }
}

/// Outcome of extracting one document. Produced once, never mutated.
pub type ExtractionResult = std::result::Result<ExtractedText, ExtractionFailure>;

/// Closed taxonomy of supported tax documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Form W-2.
    WageStatement,
    /// Form 1099-INT.
    InterestStatement,
    /// Form 1099-DIV.
    DividendStatement,
    /// Forms 1099-MISC and 1099-NEC.
    MiscCompensation,
    /// Form 1099-R.
    RetirementDistribution,
    /// Form 1098.
    MortgageInterest,
    /// Schedule K-1.
    PartnershipShare,
    /// Nothing matched.
    Unclassified,
}

impl DocumentType {
    /// Short form label, e.g. `W-2`.
    pub fn form_label(&self) -> &'static str {
        match self {
            Self::WageStatement => "W-2",
            Self::InterestStatement => "1099-INT",
            Self::DividendStatement => "1099-DIV",
            Self::MiscCompensation => "1099-MISC/NEC",
            Self::RetirementDistribution => "1099-R",
            Self::MortgageInterest => "1098",
            Self::PartnershipShare => "K-1",
            Self::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form_label())
    }
}
