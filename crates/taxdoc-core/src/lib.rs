//! Core library for tax-document processing.
//!
//! This crate provides:
//! - Text extraction from PDFs and images (native text layer, neural OCR,
//!   Tesseract OCR) with a prioritized fallback chain
//! - Document classification (W-2, 1099 family, 1098, Schedule K-1)
//! - Field extraction with per-field plausibility ranges
//! - Aggregation of a multi-document submission into a tax summary

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod tax;

pub use error::{ConfigError, OcrError, PdfError, Result, TaxdocError, ValidationFailure};
pub use extraction::TextExtractor;
pub use models::config::TaxdocConfig;
pub use models::document::{
    DocumentKind, DocumentType, ExtractedText, ExtractionFailure, ExtractionMethod,
    ExtractionResult, FailureKind, RawDocument,
};
pub use models::profile::{FilingStatus, SummaryRecord, TaxProfile};
pub use ocr::{EngineGate, EngineStatus, OcrAdapter, OcrBackend, OcrEngineKind};
pub use pdf::{PdfExtractor, PdfProcessor};
pub use tax::{
    AggregationEngine, DocumentClassifier, FieldExtraction, FieldExtractor, FieldName,
    IssuerTable, SubmissionProcessor, SubmittedFile,
};

#[cfg(feature = "native")]
pub use ocr::NeuralOcr;

#[cfg(feature = "tesseract")]
pub use ocr::TesseractOcr;
