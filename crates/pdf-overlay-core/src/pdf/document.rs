use std::path::Path;
use std::sync::Arc;

use mupdf::Document as MuDocument;

use crate::error::{Error, Result};
use super::canvas::PdfPageCanvas;
use super::content::PageContent;
use super::page_index::PageIndex;
use super::render::PageRenderer;
use super::text::PageTextReader;

/// An open PDF being translated.
///
/// Reading (text extraction, rasterization) goes through mupdf against the
/// bytes the document was opened from, so overlays added to earlier pages
/// never leak into later extraction. Writing (overlay text) goes through a
/// lopdf copy that is persisted with [`PdfDocument::save`].
pub struct PdfDocument {
    /// The raw PDF bytes as opened
    bytes: Arc<Vec<u8>>,
    /// Number of pages
    page_count: usize,
    /// Mutable copy receiving the overlays
    writer: lopdf::Document,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        let doc = MuDocument::from_bytes(&bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = doc.page_count()
            .map_err(|e| Error::PdfOpen(format!("Failed to get page count: {e}")))?;

        let writer = lopdf::Document::load_mem(&bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to load PDF for writing: {e}")))?;

        Ok(Self {
            bytes: Arc::new(bytes),
            page_count: usize::try_from(page_count).unwrap_or(0),
            writer,
        })
    }

    /// Open a PDF from a file path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::PdfOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    /// Get number of pages
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Open the original bytes with mupdf (creates a temporary handle)
    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))
    }

    /// Writable view of one page for overlay text insertion.
    pub fn page_canvas(&mut self, page_num: usize) -> Result<PdfPageCanvas<'_>> {
        let pages = self.writer.get_pages();
        let page_index = PageIndex::try_from_page_num(page_num, pages.len())?;
        let page_id = *pages
            .get(&page_index.as_lopdf_page_number())
            .ok_or(Error::PdfInvalidPage {
                page: page_num,
                total: pages.len(),
            })?;

        PdfPageCanvas::new(&mut self.writer, page_id)
    }

    /// Persist the document, overlays included, to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.writer.save(path.as_ref()).map_err(|e| {
            Error::PdfSave(format!("Failed to write {}: {}", path.as_ref().display(), e))
        })?;
        Ok(())
    }
}

impl PageContent for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, page_num: usize) -> Result<String> {
        PageTextReader::new(self).page_text(page_num)
    }

    fn render_page_png(&self, page_num: usize, scale: f32) -> Result<Vec<u8>> {
        PageRenderer::with_scale(self, scale).render_page_png(page_num)
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
