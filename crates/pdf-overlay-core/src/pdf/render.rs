use image::{ImageEncoder, RgbImage};
use mupdf::{Colorspace, Matrix};

use crate::error::{Error, Result};
use super::document::PdfDocument;
use super::page_index::PageIndex;

/// Default linear scale for OCR rasterization (2x = 4x the pixel area)
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Page rasterizer for PDF documents, used to feed scanned pages to OCR.
pub struct PageRenderer<'a> {
    /// The PDF document to render
    pub doc: &'a PdfDocument,
    /// Scale factor for rendering
    pub scale: f32,
}

impl<'a> PageRenderer<'a> {
    /// Create a renderer with custom scale
    pub const fn with_scale(doc: &'a PdfDocument, scale: f32) -> Self {
        Self { doc, scale }
    }

    /// Render a page to an RGB image buffer
    pub fn render_page(&self, page_num: usize) -> Result<RgbImage> {
        let page_index = PageIndex::try_from_page_num(page_num, self.doc.page_count())?;
        let render_err = |reason: String| Error::PdfRender {
            page: page_num,
            reason,
        };

        let doc = self.doc.open_document()?;
        let page = doc
            .load_page(page_index.into())
            .map_err(|e| render_err(format!("Failed to load page: {e}")))?;

        let matrix = Matrix::new_scale(self.scale, self.scale);
        let pixmap = page
            .to_pixmap(&matrix, &Colorspace::device_rgb(), 1.0, true)
            .map_err(|e| render_err(format!("Failed to render: {e}")))?;

        let pixels = pixmap.samples();
        let img_width = pixmap.width();
        let img_height = pixmap.height();

        // Components per pixel; alpha and grayscale are folded into RGB
        let n = pixmap.n() as usize;
        let mut rgb_pixels = Vec::with_capacity((img_width * img_height * 3) as usize);

        for chunk in pixels.chunks(n) {
            match n {
                3 | 4 => rgb_pixels.extend_from_slice(&chunk[..3]),
                1 | 2 => rgb_pixels.extend_from_slice(&[chunk[0], chunk[0], chunk[0]]),
                _ => {
                    return Err(render_err(format!(
                        "Unexpected pixel format with {n} components"
                    )));
                }
            }
        }

        RgbImage::from_raw(img_width, img_height, rgb_pixels)
            .ok_or_else(|| render_err("Failed to create image buffer".to_string()))
    }

    /// Render a page to PNG bytes
    pub fn render_page_png(&self, page_num: usize) -> Result<Vec<u8>> {
        let img = self.render_page(page_num)?;

        let mut png_data = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new_with_quality(
            &mut png_data,
            image::codecs::png::CompressionType::Fast,
            image::codecs::png::FilterType::Adaptive,
        );

        encoder
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| Error::PdfRender {
                page: page_num,
                reason: format!("Failed to encode PNG: {e}"),
            })?;

        Ok(png_data)
    }
}
