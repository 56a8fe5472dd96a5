//! Whole-submission processing: concurrent extraction, serial fold.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::aggregate::AggregationEngine;
use super::classifier::DocumentClassifier;
use super::fields::{FieldExtraction, FieldExtractor};
use super::issuers::IssuerTable;
use crate::error::{ConfigError, ValidationFailure};
use crate::extraction::TextExtractor;
use crate::models::config::TaxdocConfig;
use crate::models::document::{
    DocumentKind, ExtractedText, ExtractionFailure, ExtractionMethod, RawDocument,
};
use crate::models::profile::{FilingStatus, SummaryRecord, TaxProfile};
use crate::ocr::OcrAdapter;

/// A file as handed over by the upload layer.
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub name: String,
    /// Declared extension, with or without the leading dot.
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl SubmittedFile {
    pub fn new(name: impl Into<String>, extension: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            bytes,
        }
    }

    /// Read a file from disk, taking the extension from its path.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, extension, bytes))
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_extension(&self.extension)
    }
}

/// What happened to one document before folding.
enum Outcome {
    Unsupported,
    Extracted {
        method: ExtractionMethod,
        extraction: FieldExtraction,
    },
    Failed(ExtractionFailure),
    Fault,
}

/// Runs a submission end to end.
///
/// Documents are extracted and classified concurrently, bounded by
/// `max_concurrent`, then folded into one profile in input order so warnings
/// come out in a stable order.
#[derive(Clone)]
pub struct SubmissionProcessor {
    extractor: TextExtractor,
    classifier: Arc<DocumentClassifier>,
    fields: Arc<FieldExtractor>,
    engine: AggregationEngine,
    max_concurrent: usize,
}

impl SubmissionProcessor {
    pub fn new(extractor: TextExtractor, issuers: Arc<IssuerTable>, config: &TaxdocConfig) -> Self {
        Self {
            extractor,
            classifier: Arc::new(DocumentClassifier::new(issuers.clone())),
            fields: Arc::new(FieldExtractor::new(config.extraction.clone(), issuers)),
            engine: AggregationEngine::new(),
            max_concurrent: config.submission.max_concurrent_documents.max(1),
        }
    }

    /// Build a processor, loading the issuer table named in `config`.
    pub fn from_config(ocr: Arc<OcrAdapter>, config: &TaxdocConfig) -> Result<Self, ConfigError> {
        let issuers = match &config.issuers.table {
            Some(path) => IssuerTable::load(path)?,
            None => IssuerTable::empty(),
        };
        Ok(Self::new(
            TextExtractor::new(ocr, config),
            Arc::new(issuers),
            config,
        ))
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    /// Extract, classify and pull fields from a single document.
    pub fn analyze(
        &self,
        document: &RawDocument,
    ) -> Result<(ExtractedText, FieldExtraction), ExtractionFailure> {
        let extracted = self.extractor.extract(document)?;
        let doc_type = self.classifier.classify(&extracted.text);
        info!(file = %document.name(), "Detected document type: {}", doc_type);
        let extraction = self.fields.extract(doc_type, &extracted.text);
        Ok((extracted, extraction))
    }

    /// Process a submission given the upload layer's filing-status token.
    pub async fn process(
        &self,
        files: Vec<SubmittedFile>,
        status_token: &str,
    ) -> Result<SummaryRecord, ValidationFailure> {
        let status: FilingStatus = status_token.parse()?;
        self.process_with_status(files, status).await
    }

    pub async fn process_with_status(
        &self,
        files: Vec<SubmittedFile>,
        status: FilingStatus,
    ) -> Result<SummaryRecord, ValidationFailure> {
        if !files.iter().any(|f| f.kind().is_some()) {
            return Err(ValidationFailure::NoDocuments);
        }
        info!("Processing {} file(s), filing status {}", files.len(), status);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let tasks = files.into_iter().map(|file| {
            let this = self.clone();
            let semaphore = semaphore.clone();
            async move {
                let name = file.name.clone();
                let Some(kind) = file.kind() else {
                    return (name, Outcome::Unsupported);
                };
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (name, Outcome::Fault);
                };

                let document = RawDocument::new(file.name, kind, file.bytes);
                let outcome = match tokio::task::spawn_blocking(move || this.analyze(&document)).await
                {
                    Ok(Ok((text, extraction))) => Outcome::Extracted {
                        method: text.method,
                        extraction,
                    },
                    Ok(Err(failure)) => Outcome::Failed(failure),
                    Err(e) => {
                        error!(file = %name, "Document processing aborted: {}", e);
                        Outcome::Fault
                    }
                };
                (name, outcome)
            }
        });
        let outcomes = join_all(tasks).await;

        let profile = outcomes
            .into_iter()
            .fold(TaxProfile::new(), |profile, (name, outcome)| match outcome {
                Outcome::Unsupported => self.engine.skip_unsupported(profile, &name),
                Outcome::Extracted { method, extraction } => {
                    self.engine.fold(profile, &name, method, &extraction)
                }
                Outcome::Failed(failure) => self.engine.record_failure(profile, &name, &failure),
                Outcome::Fault => self.engine.record_fault(profile, &name),
            });

        Ok(self.engine.finalize(&profile, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrEngineKind, ScriptedOcr};
    use image::{DynamicImage, ImageFormat};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn png() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::new_rgb8(8, 8)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn processor(ocr_text: &str) -> SubmissionProcessor {
        let config = TaxdocConfig::default();
        let ocr = OcrAdapter::builder()
            .with_traditional(Arc::new(ScriptedOcr::new(OcrEngineKind::Traditional, ocr_text)))
            .build();
        SubmissionProcessor::new(
            TextExtractor::new(Arc::new(ocr), &config),
            Arc::new(IssuerTable::empty()),
            &config,
        )
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let files = vec![SubmittedFile::new("w2.png", "png", png())];
        let err = processor("").process(files, "widowed").await.unwrap_err();
        assert!(matches!(err, ValidationFailure::UnsupportedFilingStatus { .. }));
    }

    #[tokio::test]
    async fn test_no_valid_documents_is_rejected() {
        let p = processor("");
        assert_eq!(
            p.process(Vec::new(), "single").await.unwrap_err(),
            ValidationFailure::NoDocuments
        );
        let files = vec![SubmittedFile::new("notes.docx", "docx", b"hi".to_vec())];
        assert_eq!(
            p.process(files, "single").await.unwrap_err(),
            ValidationFailure::NoDocuments
        );
    }

    #[tokio::test]
    async fn test_image_submission() {
        let files = vec![
            SubmittedFile::new("notes.docx", "docx", b"hi".to_vec()),
            SubmittedFile::new("w2.png", ".PNG", png()),
        ];
        let summary = processor("Wages 54000.00 ... Federal tax withheld 6200.00")
            .process(files, "single")
            .await
            .unwrap();

        assert_eq!(summary.total_income, "54,000.00");
        assert_eq!(summary.tax, "4,598.00");
        assert!(summary.is_refund);
        assert_eq!(summary.warnings()[0], "Skipping unsupported file: notes.docx");
        assert_eq!(summary.documents.len(), 1);
        assert_eq!(summary.documents[0].method, Some(ExtractionMethod::TraditionalOcr));
    }

    #[tokio::test]
    async fn test_undecodable_document_becomes_warning() {
        let files = vec![
            SubmittedFile::new("broken.pdf", "pdf", b"not a pdf".to_vec()),
            SubmittedFile::new("w2.png", "png", png()),
        ];
        let summary = processor("Wages 54000.00 ... Federal tax withheld 6200.00")
            .with_max_concurrent(1)
            .process(files, "single")
            .await
            .unwrap();

        assert_eq!(summary.total_income, "54,000.00");
        assert_eq!(
            summary.warnings()[0],
            "Failed to extract text from broken.pdf: file could not be decoded"
        );
    }
}
