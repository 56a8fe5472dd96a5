//! Error types for the taxdoc-core library.

use thiserror::Error;

/// Main error type for the taxdoc library.
#[derive(Error, Debug)]
pub enum TaxdocError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Configuration or issuer-table error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Submission rejected before any extraction ran.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract or rasterize page images.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The engine is not ready (still warming up or unavailable).
    #[error("OCR engine not ready: {0}")]
    NotReady(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while loading configuration or the issuer-override table.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A pattern in the issuer table does not compile.
    #[error("issuer {issuer}: invalid pattern {pattern:?}: {reason}")]
    Pattern {
        issuer: String,
        pattern: String,
        reason: String,
    },

    /// A fixed value or bound in the issuer table is not a decimal.
    #[error("issuer {issuer}: invalid amount {value:?}")]
    Amount { issuer: String, value: String },

    /// An issuer entry has no signatures to match on.
    #[error("issuer {0}: at least one signature is required")]
    NoSignatures(String),
}

/// Submission-level failures. These abort the whole submission before any
/// document is extracted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The filing-status token is not one of the supported values.
    #[error("invalid filing status {token:?}; must be one of: {allowed}")]
    UnsupportedFilingStatus { token: String, allowed: String },

    /// Nothing processable was submitted.
    #[error("no valid documents were submitted")]
    NoDocuments,
}

/// Result type for the taxdoc library.
pub type Result<T> = std::result::Result<T, TaxdocError>;
