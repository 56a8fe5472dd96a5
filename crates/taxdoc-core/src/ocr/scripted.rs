//! Backend that answers from a script instead of looking at pixels.
//!
//! Used by tests and demos to drive the extraction pipeline without model
//! files or a system Tesseract install.

use std::sync::Mutex;

use image::DynamicImage;

use super::{OcrBackend, OcrEngineKind, RecognitionPass};
use crate::error::OcrError;

/// Returns preset text, optionally varying by recognition pass.
pub struct ScriptedOcr {
    kind: OcrEngineKind,
    text: String,
    by_pass: Vec<(RecognitionPass, String)>,
    failure: Option<String>,
    panics: bool,
    calls: Mutex<Vec<RecognitionPass>>,
}

impl ScriptedOcr {
    /// Backend returning `text` for every pass.
    pub fn new(kind: OcrEngineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            by_pass: Vec::new(),
            failure: None,
            panics: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Backend whose every call fails with a recognition error.
    pub fn failing(kind: OcrEngineKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(kind, "")
        }
    }

    /// Backend that panics on every call, standing in for a crashing
    /// native engine.
    pub fn panicking(kind: OcrEngineKind) -> Self {
        Self {
            panics: true,
            ..Self::new(kind, "")
        }
    }

    /// Return `text` for `pass` instead of the default text.
    pub fn on_pass(mut self, pass: RecognitionPass, text: impl Into<String>) -> Self {
        self.by_pass.push((pass, text.into()));
        self
    }

    /// Passes seen so far, in call order.
    pub fn calls(&self) -> Vec<RecognitionPass> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl OcrBackend for ScriptedOcr {
    fn kind(&self) -> OcrEngineKind {
        self.kind
    }

    fn recognize(&self, _image: &DynamicImage, pass: RecognitionPass) -> Result<String, OcrError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(pass);
        }
        if self.panics {
            panic!("scripted OCR engine crashed");
        }
        if let Some(message) = &self.failure {
            return Err(OcrError::Recognition(message.clone()));
        }
        let text = self
            .by_pass
            .iter()
            .find(|(p, _)| *p == pass)
            .map(|(_, text)| text.clone())
            .unwrap_or_else(|| self.text.clone());
        Ok(text)
    }
}
