//! PDF text and image extraction using lopdf and pdf-extract.

use std::panic::{AssertUnwindSafe, catch_unwind};

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;

/// US Letter, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.document()?
            .get_pages()
            .get(&page)
            .copied()
            .ok_or(PdfError::InvalidPage(page))
    }

    fn try_extract_image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        // Only image XObjects
        let subtype = dict.get(b"Subtype").ok()?;
        if subtype.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    trace!("Decoding JPEG image");
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter: {:?}", filter_name.map(String::from_utf8_lossy));
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        create_image_from_raw(&data, width, height, color_space, bits)
    }

    /// Walk up the page tree until a dictionary carries `key`.
    fn inherited_attribute<'a>(
        &self,
        doc: &'a Document,
        node_id: ObjectId,
        key: &[u8],
    ) -> Option<&'a Object> {
        let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
            return None;
        };
        if let Ok(value) = dict.get(key) {
            return doc.dereference(value).ok().map(|(_, obj)| obj);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.inherited_attribute(doc, *parent_id, key),
            _ => None,
        }
    }

    fn page_resources(&self, doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
        match self.inherited_attribute(doc, page_id, b"Resources")? {
            Object::Dictionary(dict) => Some(dict.clone()),
            _ => None,
        }
    }

    /// Page size in points as (width, height).
    fn page_size(&self, doc: &Document, page_id: ObjectId) -> (f32, f32) {
        let bounds: Vec<f32> = match self.inherited_attribute(doc, page_id, b"MediaBox") {
            Some(Object::Array(arr)) => arr
                .iter()
                .filter_map(|obj| match obj {
                    Object::Integer(i) => Some(*i as f32),
                    Object::Real(f) => Some(*f),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let [x0, y0, x1, y1] = match bounds.as_slice() {
            [a, b, c, d] => [*a, *b, *c, *d],
            _ => DEFAULT_MEDIA_BOX,
        };
        ((x1 - x0).abs(), (y1 - y0).abs())
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // Save decrypted document to raw_data for pdf_extract
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<Vec<String>> {
        self.document()?;
        // pdf-extract panics on some malformed font programs.
        let pages = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
        }))
        .map_err(|_| PdfError::TextExtraction("text reader panicked".to_string()))?
        .map_err(|e| PdfError::TextExtraction(e.to_string()))?;
        Ok(pages)
    }

    fn extract_text_fallback(&self) -> Result<Vec<String>> {
        let doc = self.document()?;
        let mut pages = Vec::new();
        for page in doc.get_pages().keys() {
            match doc.extract_text(&[*page]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    warn!("Fallback text reader failed on page {}: {}", page, e);
                    pages.push(String::new());
                }
            }
        }
        Ok(pages)
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let doc = self.document()?;
        let page_id = self.page_id(page)?;

        // Scanned forms carry one full-page image; take the largest.
        let image = self
            .extract_images(page)?
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| {
                PdfError::ImageExtraction(format!("No images found on page {}", page))
            })?;

        let (width_pts, height_pts) = self.page_size(doc, page_id);
        let target_w = (width_pts / 72.0 * dpi as f32).round().max(1.0) as u32;
        let target_h = (height_pts / 72.0 * dpi as f32).round().max(1.0) as u32;

        if image.width() > target_w || image.height() > target_h {
            debug!(
                "Scaling page {} image {}x{} to fit {}x{} ({} dpi)",
                page,
                image.width(),
                image.height(),
                target_w,
                target_h,
                dpi
            );
            return Ok(image.resize(target_w, target_h, FilterType::Lanczos3));
        }
        Ok(image)
    }

    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let doc = self.document()?;
        let page_id = self.page_id(page)?;

        let mut images = Vec::new();

        if let Some(resources) = self.page_resources(doc, page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.try_extract_image_from_object(doc, obj) {
                                images.push(img);
                            }
                        }
                    }
                }
            }
        }

        debug!("Extracted {} images from page {}", images.len(), page);
        Ok(images)
    }
}

fn create_image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    let channels = match color_space {
        b"DeviceRGB" | b"RGB" => 3,
        b"DeviceGray" | b"G" => 1,
        _ => {
            trace!("Unsupported color space: {}", String::from_utf8_lossy(color_space));
            return None;
        }
    };

    if data.len() < pixels * channels {
        trace!(
            "Could not decode image: data_len={}, expected={}",
            data.len(),
            pixels * channels
        );
        return None;
    }

    let mut rgba_data = Vec::with_capacity(pixels * 4);
    for chunk in data[..pixels * channels].chunks(channels) {
        match chunk {
            [gray] => rgba_data.extend_from_slice(&[*gray, *gray, *gray, 255]),
            [r, g, b] => rgba_data.extend_from_slice(&[*r, *g, *b, 255]),
            _ => return None,
        }
    }
    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba_data).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Stream, dictionary};

    fn finish(mut doc: Document, pages_id: ObjectId, page_ids: Vec<ObjectId>) -> Vec<u8> {
        let count = page_ids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<_>>(),
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn text_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        finish(doc, pages_id, vec![page_id])
    }

    fn image_pdf(width: i64, height: i64, media_box: (i64, i64)) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let pixels = vec![200u8; (width * height) as usize];
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        ));
        let content = format!("q {} 0 0 {} 0 0 cm /Im1 Do Q", media_box.0, media_box.1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), media_box.0.into(), media_box.1.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
        });
        finish(doc, pages_id, vec![page_id])
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_text().is_err());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut extractor = PdfExtractor::new();
        assert!(matches!(extractor.load(b"not a pdf"), Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_both_readers_see_text_layer() {
        let mut extractor = PdfExtractor::new();
        extractor
            .load(&text_pdf(&["Form W-2 Wage and Tax Statement", "Wages 54000.00"]))
            .unwrap();
        assert_eq!(extractor.page_count(), 1);

        let primary = extractor.extract_text().unwrap().concat();
        assert!(primary.contains("Wage and Tax Statement"), "got: {primary}");

        let fallback = extractor.extract_text_fallback().unwrap().concat();
        assert!(fallback.contains("54000.00"), "got: {fallback}");
    }

    #[test]
    fn test_render_page_keeps_small_image() {
        let mut extractor = PdfExtractor::new();
        extractor.load(&image_pdf(40, 20, (612, 792))).unwrap();
        let page = extractor.render_page(1, 72).unwrap();
        assert_eq!((page.width(), page.height()), (40, 20));
    }

    #[test]
    fn test_render_page_scales_to_dpi() {
        let mut extractor = PdfExtractor::new();
        extractor.load(&image_pdf(400, 100, (72, 72))).unwrap();
        let page = extractor.render_page(1, 100).unwrap();
        assert_eq!((page.width(), page.height()), (100, 25));
    }

    #[test]
    fn test_render_page_without_images_fails() {
        let mut extractor = PdfExtractor::new();
        extractor.load(&text_pdf(&["no images here"])).unwrap();
        assert!(matches!(
            extractor.render_page(1, 200),
            Err(PdfError::ImageExtraction(_))
        ));
        assert!(matches!(extractor.render_page(7, 200), Err(PdfError::InvalidPage(7))));
    }
}
