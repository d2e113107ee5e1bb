use crate::config::TextColor;
use crate::error::Result;

/// Page geometry in PDF points with a top-left origin
/// (x grows to the right, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter, used when a page has no usable MediaBox
    pub const fn letter() -> Self {
        Self::new(612.0, 792.0)
    }
}

/// Read side of a document: what classification and extraction need.
///
/// `PdfDocument` implements this on top of mupdf; tests substitute
/// in-memory fakes.
pub trait PageContent {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Directly extractable text of a page (0-based), lines separated by `\n`
    fn page_text(&self, page_num: usize) -> Result<String>;

    /// Rasterize a page (0-based) to PNG at `scale` times its point size
    fn render_page_png(&self, page_num: usize, scale: f32) -> Result<Vec<u8>>;
}

/// Write side of a single page: where overlay text lands.
///
/// Coordinates passed to [`TextSurface::insert_text`] use the same top-left
/// origin as [`PageRect`]; `origin` is the baseline start of the line.
pub trait TextSurface {
    /// Size of the page in points
    fn page_size(&self) -> PageRect;

    /// Draw one line of text
    fn insert_text(
        &mut self,
        origin: (f32, f32),
        text: &str,
        font_size: f32,
        color: TextColor,
    ) -> Result<()>;
}
