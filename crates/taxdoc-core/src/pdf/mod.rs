//! PDF processing module.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\x0c\n";

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract the embedded text layer, one entry per page.
    fn extract_text(&self) -> Result<Vec<String>>;

    /// Extract the embedded text layer with a second, independent reader.
    fn extract_text_fallback(&self) -> Result<Vec<String>>;

    /// Render a page as an image at the specified DPI.
    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage>;

    /// Extract embedded images from a page.
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;
}

/// Whether `text` carries more than `min_chars` non-whitespace characters.
pub fn is_meaningful(text: &str, min_chars: usize) -> bool {
    text.chars().filter(|c| !c.is_whitespace()).count() > min_chars
}

/// Join per-page text with [`PAGE_SEPARATOR`], skipping blank pages.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_meaningful_counts_non_whitespace() {
        let padded = format!("{}{}", " \n\t".repeat(100), "x".repeat(50));
        assert!(!is_meaningful(&padded, 50));
        assert!(is_meaningful(&"x".repeat(51), 50));
        assert!(!is_meaningful("", 0));
    }

    #[test]
    fn test_join_pages_skips_blank() {
        let joined = join_pages(&["first", "  ", "second\n"]);
        assert_eq!(joined, format!("first{PAGE_SEPARATOR}second"));
    }
}
