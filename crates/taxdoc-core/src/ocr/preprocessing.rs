//! Image preprocessing for OCR.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::OcrError;

/// Image preprocessor shared by every OCR backend.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self { max_size: 3000 }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size.max(1);
        self
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Decode image bytes (PNG, JPEG, ...).
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage, OcrError> {
        image::load_from_memory(data).map_err(|e| OcrError::InvalidImage(e.to_string()))
    }

    /// Downscale oversized images and normalize the color mode.
    pub fn prepare(&self, image: DynamicImage) -> DynamicImage {
        self.prepare_within(image, self.max_size)
    }

    /// Like [`prepare`](Self::prepare) with an explicit dimension bound.
    pub fn prepare_within(&self, image: DynamicImage, max_size: u32) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = calculate_resize_dimensions(width, height, max_size);

        let image = if (new_width, new_height) != (width, height) {
            debug!(
                "Downscaling image from {}x{} to {}x{}",
                width, height, new_width, new_height
            );
            image.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        } else {
            image
        };

        match image {
            DynamicImage::ImageRgb8(_) => image,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        }
    }

    /// Encode as PNG for engines that take encoded bytes.
    pub fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>, OcrError> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(e.to_string()))?;
        Ok(buf)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn calculate_resize_dimensions(width: u32, height: u32, target_size: u32) -> (u32, u32) {
    let max_dim = width.max(height);

    if max_dim <= target_size {
        return (width, height);
    }

    let scale = target_size as f32 / max_dim as f32;
    let new_width = (width as f32 * scale).round() as u32;
    let new_height = (height as f32 * scale).round() as u32;

    (new_width.clamp(1, target_size), new_height.clamp(1, target_size))
}
