//! Neural → traditional OCR fall-through with the traditional engine's
//! retry passes.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, warn};

use super::{EngineGate, ImagePreprocessor, OcrBackend, OcrEngineKind, RecognitionPass};
use crate::models::config::{OcrConfig, PageSegmentation};

/// Text recognized from one image and the engine that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognized {
    pub text: String,
    pub engine: OcrEngineKind,
}

/// Chains the available OCR engines behind one `recognize` call.
///
/// The neural engine is consulted only when its gate is open; a closed gate,
/// an error, and an empty result all fall through to the traditional engine.
pub struct OcrAdapter {
    neural: Option<EngineGate>,
    traditional: Option<Arc<dyn OcrBackend>>,
    preprocessor: ImagePreprocessor,
    page_max_size: u32,
    segmentation_fallbacks: Vec<PageSegmentation>,
}

impl OcrAdapter {
    /// Create a builder.
    pub fn builder() -> OcrAdapterBuilder {
        OcrAdapterBuilder::new()
    }

    /// Adapter with no engines. Every call returns `None`.
    pub fn disabled() -> Self {
        Self::builder().build()
    }

    /// Whether the neural engine can take work right now.
    pub fn neural_ready(&self) -> bool {
        self.neural.as_ref().is_some_and(|gate| gate.engine().is_some())
    }

    /// Whether any engine is configured at all.
    pub fn has_engines(&self) -> bool {
        self.neural.is_some() || self.traditional.is_some()
    }

    pub fn has_traditional(&self) -> bool {
        self.traditional.is_some()
    }

    pub fn neural_gate(&self) -> Option<&EngineGate> {
        self.neural.as_ref()
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// Recognize a standalone image.
    pub fn recognize(&self, image: DynamicImage) -> Option<Recognized> {
        let image = self.preprocessor.prepare(image);
        self.run(&image)
    }

    /// Recognize a rasterized PDF page, using the tighter page bound.
    pub fn recognize_page(&self, image: DynamicImage) -> Option<Recognized> {
        let image = self.preprocessor.prepare_within(image, self.page_max_size);
        self.run(&image)
    }

    fn run(&self, image: &DynamicImage) -> Option<Recognized> {
        if let Some(text) = self.run_neural(image) {
            return Some(Recognized {
                text,
                engine: OcrEngineKind::Neural,
            });
        }
        self.run_traditional(image).map(|text| Recognized {
            text,
            engine: OcrEngineKind::Traditional,
        })
    }

    fn run_neural(&self, image: &DynamicImage) -> Option<String> {
        let gate = self.neural.as_ref()?;
        let Some(engine) = gate.engine() else {
            debug!("Neural OCR {}, skipping", gate.status());
            return None;
        };
        match engine.recognize(image, RecognitionPass::Default) {
            Ok(text) if has_text(&text) => Some(text),
            Ok(_) => {
                debug!("Neural OCR returned no text");
                None
            }
            Err(e) => {
                warn!("Neural OCR failed: {}", e);
                None
            }
        }
    }

    fn run_traditional(&self, image: &DynamicImage) -> Option<String> {
        let engine = self.traditional.as_ref()?;
        for pass in self.traditional_passes() {
            match engine.recognize(image, pass) {
                Ok(text) if has_text(&text) => {
                    debug!("Traditional OCR succeeded on {} pass", pass);
                    return Some(text);
                }
                Ok(_) => debug!("Traditional OCR {} pass returned no text", pass),
                Err(e) => warn!("Traditional OCR {} pass failed: {}", pass, e),
            }
        }
        None
    }

    /// Default, then alternate mode, then each segmentation fallback.
    pub fn traditional_passes(&self) -> Vec<RecognitionPass> {
        [RecognitionPass::Default, RecognitionPass::Alternate]
            .into_iter()
            .chain(
                self.segmentation_fallbacks
                    .iter()
                    .copied()
                    .map(RecognitionPass::Segmentation),
            )
            .collect()
    }
}

fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Builder for [`OcrAdapter`].
pub struct OcrAdapterBuilder {
    neural: Option<EngineGate>,
    traditional: Option<Arc<dyn OcrBackend>>,
    config: OcrConfig,
}

impl OcrAdapterBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            neural: None,
            traditional: None,
            config: OcrConfig::default(),
        }
    }

    /// Use the neural engine behind `gate`.
    pub fn with_neural(mut self, gate: EngineGate) -> Self {
        self.neural = Some(gate);
        self
    }

    /// Use `engine` as the traditional engine.
    pub fn with_traditional(mut self, engine: Arc<dyn OcrBackend>) -> Self {
        self.traditional = Some(engine);
        self
    }

    /// Take preprocessing bounds and retry policy from `config`.
    pub fn with_config(mut self, config: &OcrConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Build the adapter.
    pub fn build(self) -> OcrAdapter {
        OcrAdapter {
            neural: self.neural,
            traditional: self.traditional,
            preprocessor: ImagePreprocessor::new().with_max_size(self.config.max_image_dimension),
            page_max_size: self
                .config
                .neural_max_dimension
                .min(self.config.max_image_dimension),
            segmentation_fallbacks: self.config.segmentation_fallbacks,
        }
    }
}

impl Default for OcrAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
