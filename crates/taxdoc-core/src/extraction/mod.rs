//! Text extraction: native PDF text first, OCR as the fallback.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::models::config::{PdfConfig, TaxdocConfig};
use crate::models::document::{
    DocumentKind, ExtractedText, ExtractionFailure, ExtractionMethod, ExtractionResult,
    FailureKind, RawDocument,
};
use crate::ocr::{OcrAdapter, OcrEngineKind};
use crate::pdf::{self, PdfExtractor, PdfProcessor};

/// Turns a raw upload into plain text.
///
/// `extract` never returns an error or panics past its boundary for
/// undecodable input; every outcome is an [`ExtractionResult`].
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<OcrAdapter>,
    pdf: PdfConfig,
}

/// Text gathered by one strategy before it is judged.
struct Attempt {
    text: String,
    method: ExtractionMethod,
    pages_ocred: usize,
}

impl TextExtractor {
    pub fn new(ocr: Arc<OcrAdapter>, config: &TaxdocConfig) -> Self {
        Self {
            ocr,
            pdf: config.pdf.clone(),
        }
    }

    /// Extractor without OCR: only PDF text layers are read.
    pub fn native_only(config: &TaxdocConfig) -> Self {
        Self::new(Arc::new(OcrAdapter::disabled()), config)
    }

    pub fn ocr(&self) -> &OcrAdapter {
        &self.ocr
    }

    /// Extract plain text from `document`.
    pub fn extract(&self, document: &RawDocument) -> ExtractionResult {
        let start = Instant::now();
        let attempt = match document.kind() {
            DocumentKind::Pdf => self.extract_pdf(document),
            DocumentKind::Image => self.extract_image(document),
        };

        let elapsed = start.elapsed();
        match attempt {
            Ok(attempt) => {
                info!(
                    file = %document.name(),
                    method = %attempt.method,
                    chars = attempt.text.len(),
                    "Extracted text in {:.2}s",
                    elapsed.as_secs_f64()
                );
                trace!(file = %document.name(), "Extracted text:\n{}", attempt.text);
                Ok(ExtractedText {
                    text: attempt.text,
                    method: attempt.method,
                    elapsed,
                    pages_ocred: attempt.pages_ocred,
                })
            }
            Err(failure) => {
                warn!(
                    file = %document.name(),
                    kind = ?failure.kind,
                    last_method = %failure.last_method,
                    "Text extraction failed: {}",
                    failure.message
                );
                Err(failure)
            }
        }
    }

    fn extract_pdf(&self, document: &RawDocument) -> Result<Attempt, ExtractionFailure> {
        let mut extractor = PdfExtractor::new();
        if let Err(e) = extractor.load(document.bytes()) {
            return Err(ExtractionFailure::new(
                FailureKind::Undecodable,
                e.to_string(),
                ExtractionMethod::None,
            ));
        }

        let readers: [(&str, fn(&PdfExtractor) -> pdf::Result<Vec<String>>); 2] = [
            ("primary", |e| e.extract_text()),
            ("fallback", |e| e.extract_text_fallback()),
        ];

        // Short native text is kept in case OCR finds nothing better.
        let mut best_native = String::new();
        for (name, read) in readers {
            match read(&extractor) {
                Ok(pages) => {
                    let text = pdf::join_pages(&pages);
                    if pdf::is_meaningful(&text, self.pdf.min_text_chars) {
                        debug!("{} text reader produced {} chars", name, text.len());
                        return Ok(Attempt {
                            text,
                            method: ExtractionMethod::NativePdfText,
                            pages_ocred: 0,
                        });
                    }
                    debug!("{} text reader produced minimal text", name);
                    if text.trim().len() > best_native.trim().len() {
                        best_native = text;
                    }
                }
                Err(e) => debug!("{} text reader failed: {}", name, e),
            }
        }

        info!("Minimal native text, likely an image-based PDF; switching to OCR");
        match self.ocr_pdf_pages(&extractor) {
            Some(attempt) => Ok(attempt),
            None if !best_native.trim().is_empty() => Ok(Attempt {
                text: best_native,
                method: ExtractionMethod::NativePdfText,
                pages_ocred: 0,
            }),
            None => Err(ExtractionFailure::new(
                FailureKind::NoText,
                "no text layer and OCR found no text",
                self.last_ocr_method().unwrap_or(ExtractionMethod::NativePdfText),
            )),
        }
    }

    /// Rasterize and OCR pages up to the cap for the engine in use.
    fn ocr_pdf_pages(&self, extractor: &PdfExtractor) -> Option<Attempt> {
        if !self.ocr.has_engines() {
            debug!("No OCR engine configured");
            return None;
        }

        let cap = if self.ocr.neural_ready() {
            self.pdf.neural_page_cap
        } else {
            self.pdf.traditional_page_cap
        };
        let page_count = extractor.page_count() as usize;
        if page_count > cap {
            info!("Processing only the first {} of {} pages", cap, page_count);
        }

        let mut pages = Vec::new();
        let mut pages_ocred = 0;
        let mut used_neural = false;
        for page in 1..=page_count.min(cap) as u32 {
            // The page image is owned by this iteration and dropped at its end.
            let image = match extractor.render_page(page, self.pdf.render_dpi) {
                Ok(image) => image,
                Err(e) => {
                    debug!("Could not rasterize page {}: {}", page, e);
                    continue;
                }
            };
            pages_ocred += 1;
            match self.ocr.recognize_page(image) {
                Some(recognized) => {
                    used_neural |= recognized.engine == OcrEngineKind::Neural;
                    pages.push(recognized.text);
                }
                None => debug!("No text found on page {}", page),
            }
        }

        let text = pdf::join_pages(&pages);
        if text.is_empty() {
            return None;
        }
        let engine = if used_neural {
            OcrEngineKind::Neural
        } else {
            OcrEngineKind::Traditional
        };
        Some(Attempt {
            text,
            method: engine.method(),
            pages_ocred,
        })
    }

    fn extract_image(&self, document: &RawDocument) -> Result<Attempt, ExtractionFailure> {
        let image = self.ocr.preprocessor().decode(document.bytes()).map_err(|e| {
            ExtractionFailure::new(FailureKind::Undecodable, e.to_string(), ExtractionMethod::None)
        })?;

        match self.ocr.recognize(image) {
            Some(recognized) => Ok(Attempt {
                text: recognized.text,
                method: recognized.engine.method(),
                pages_ocred: 1,
            }),
            None => Err(ExtractionFailure::new(
                FailureKind::NoText,
                "OCR found no text in image",
                self.last_ocr_method().unwrap_or(ExtractionMethod::None),
            )),
        }
    }

    /// The last engine an OCR attempt would have reached.
    fn last_ocr_method(&self) -> Option<ExtractionMethod> {
        if !self.ocr.has_engines() {
            return None;
        }
        if self.ocr.has_traditional() {
            Some(ExtractionMethod::TraditionalOcr)
        } else {
            Some(ExtractionMethod::NeuralOcr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{EngineGate, OcrBackend, ScriptedOcr};
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([255])));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn extractor_with(traditional: Arc<dyn OcrBackend>) -> TextExtractor {
        let adapter = OcrAdapter::builder().with_traditional(traditional).build();
        TextExtractor::new(Arc::new(adapter), &TaxdocConfig::default())
    }

    #[test]
    fn test_image_goes_through_ocr() {
        let extractor = extractor_with(Arc::new(ScriptedOcr::new(
            OcrEngineKind::Traditional,
            "Interest Income 150.00",
        )));
        let doc = RawDocument::new("int.png", DocumentKind::Image, png_bytes());
        let extracted = extractor.extract(&doc).unwrap();
        assert_eq!(extracted.method, ExtractionMethod::TraditionalOcr);
        assert_eq!(extracted.text, "Interest Income 150.00");
        assert_eq!(extracted.pages_ocred, 1);
    }

    #[test]
    fn test_neural_image_reports_neural_method() {
        let neural: Arc<dyn OcrBackend> =
            Arc::new(ScriptedOcr::new(OcrEngineKind::Neural, "Form W-2"));
        let adapter = OcrAdapter::builder()
            .with_neural(EngineGate::ready(neural))
            .build();
        let extractor = TextExtractor::new(Arc::new(adapter), &TaxdocConfig::default());
        let doc = RawDocument::new("w2.jpg", DocumentKind::Image, png_bytes());
        assert_eq!(extractor.extract(&doc).unwrap().method, ExtractionMethod::NeuralOcr);
    }

    #[test]
    fn test_undecodable_image_is_failure_not_panic() {
        let extractor = extractor_with(Arc::new(ScriptedOcr::new(OcrEngineKind::Traditional, "x")));
        let doc = RawDocument::new("bad.png", DocumentKind::Image, b"garbage".to_vec());
        let failure = extractor.extract(&doc).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Undecodable);
    }

    #[test]
    fn test_blank_ocr_is_no_text_failure() {
        let extractor = extractor_with(Arc::new(ScriptedOcr::new(OcrEngineKind::Traditional, " ")));
        let doc = RawDocument::new("blank.png", DocumentKind::Image, png_bytes());
        let failure = extractor.extract(&doc).unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoText);
        assert_eq!(failure.last_method, ExtractionMethod::TraditionalOcr);
    }

    #[test]
    fn test_garbage_pdf_is_undecodable() {
        let extractor = TextExtractor::native_only(&TaxdocConfig::default());
        let doc = RawDocument::new("bad.pdf", DocumentKind::Pdf, b"%PDF-1.4 nonsense".to_vec());
        let failure = extractor.extract(&doc).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Undecodable);
        assert_eq!(failure.kind.to_string(), "file could not be decoded");
    }
}
