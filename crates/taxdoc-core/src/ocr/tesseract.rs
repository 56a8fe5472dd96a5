//! Traditional OCR backend using Tesseract through `leptess`.
//!
//! Requires system libtesseract and libleptonica.

use std::path::PathBuf;

use image::DynamicImage;
use leptess::{LepTess, Variable};
use tracing::trace;

use super::{ImagePreprocessor, OcrBackend, OcrEngineKind, RecognitionPass};
use crate::error::OcrError;
use crate::models::config::{OcrConfig, PageSegmentation};

/// Tesseract engine. A fresh instance is initialized per call, so one
/// `TesseractOcr` can serve concurrent documents.
pub struct TesseractOcr {
    data_path: Option<PathBuf>,
    language: String,
    encoder: ImagePreprocessor,
}

impl TesseractOcr {
    pub fn new(data_path: Option<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            data_path,
            language: language.into(),
            encoder: ImagePreprocessor::new(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tessdata_dir.clone(), config.tesseract_language.clone())
    }

    /// Check that the language data can be loaded.
    pub fn check_language_data(&self) -> Result<(), OcrError> {
        self.session().map(|_| ())
    }

    fn session(&self) -> Result<LepTess, OcrError> {
        let data_path = self.data_path.as_ref().map(|p| p.display().to_string());
        LepTess::new(data_path.as_deref(), &self.language)
            .map_err(|e| OcrError::ModelLoad(format!("tesseract ({}): {}", self.language, e)))
    }
}

/// Page-segmentation mode used by each pass. The alternate pass looks for
/// sparse text anywhere on the page.
fn psm_for(pass: RecognitionPass) -> Option<u8> {
    match pass {
        RecognitionPass::Default => None,
        RecognitionPass::Alternate => Some(PageSegmentation::SparseText.psm()),
        RecognitionPass::Segmentation(seg) => Some(seg.psm()),
    }
}

impl OcrBackend for TesseractOcr {
    fn kind(&self) -> OcrEngineKind {
        OcrEngineKind::Traditional
    }

    fn recognize(&self, image: &DynamicImage, pass: RecognitionPass) -> Result<String, OcrError> {
        let mut lt = self.session()?;
        if let Some(psm) = psm_for(pass) {
            lt.set_variable(Variable::TesseditPagesegMode, &psm.to_string())
                .map_err(|e| OcrError::Recognition(e.to_string()))?;
        }

        let png = self.encoder.encode_png(image)?;
        lt.set_image_from_mem(&png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| OcrError::Recognition(e.to_string()))?;
        trace!("Tesseract {} pass: {} chars", pass, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_to_psm() {
        assert_eq!(psm_for(RecognitionPass::Default), None);
        assert_eq!(psm_for(RecognitionPass::Alternate), Some(11));
        assert_eq!(
            psm_for(RecognitionPass::Segmentation(PageSegmentation::SingleBlock)),
            Some(6)
        );
    }
}
