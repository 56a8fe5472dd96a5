//! Neural OCR backend using `pure-onnx-ocr` (pure Rust, no external ONNX
//! Runtime).

use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::{OcrBackend, OcrEngineKind, RecognitionPass};
use crate::error::OcrError;
use crate::models::config::ModelConfig;

/// Rows closer than this many pixels are read as one line.
const ROW_HEIGHT: f64 = 20.0;

/// Detector + recognizer pair loaded from ONNX model files.
pub struct NeuralOcr {
    engine: pure_onnx_ocr::engine::OcrEngine,
    strip_unknown_tokens: bool,
}

impl NeuralOcr {
    /// Load models from the files named in `models`.
    ///
    /// Slow; run it behind an [`EngineGate`](super::EngineGate).
    pub fn load(models: &ModelConfig, strip_unknown_tokens: bool) -> Result<Self, OcrError> {
        let det_path = models.model_dir.join(&models.detection_model);
        let rec_path = models.model_dir.join(&models.recognition_model);
        let dict_path = models.model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing {}", path.display())));
            }
        }

        let start = Instant::now();
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!(
            "Loaded neural OCR models from {} in {:?}",
            models.model_dir.display(),
            start.elapsed()
        );

        Ok(Self {
            engine,
            strip_unknown_tokens,
        })
    }
}

impl OcrBackend for NeuralOcr {
    fn kind(&self) -> OcrEngineKind {
        OcrEngineKind::Neural
    }

    fn recognize(&self, image: &DynamicImage, _pass: RecognitionPass) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let mut lines: Vec<((f64, f64), String)> = results
            .iter()
            .map(|r| {
                let text = if self.strip_unknown_tokens {
                    r.text.replace("[UNK]", " ")
                } else {
                    r.text.clone()
                };
                (top_left(&r.bounding_box), text)
            })
            .collect();

        // Reading order: top-to-bottom by row, then left-to-right
        lines.sort_by(|((ax, ay), _), ((bx, by), _)| {
            let row_a = (ay / ROW_HEIGHT) as i64;
            let row_b = (by / ROW_HEIGHT) as i64;
            row_a
                .cmp(&row_b)
                .then(ax.partial_cmp(bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        let text = lines
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            "Neural OCR on {}x{} image took {}ms",
            width,
            height,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Minimum x and y over the polygon's exterior.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .fold((f64::INFINITY, f64::INFINITY), |(x, y), c| (x.min(c.x), y.min(c.y)))
}
