use mupdf::TextPageOptions;

use crate::error::{Error, Result};
use super::document::PdfDocument;
use super::page_index::PageIndex;

/// Plain-text reader for PDF pages (mupdf's structured text, flattened).
pub struct PageTextReader<'a> {
    /// The PDF document to read text from
    pub doc: &'a PdfDocument,
}

impl<'a> PageTextReader<'a> {
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self { doc }
    }

    /// Get the plain text of a page.
    ///
    /// Lines are joined with `\n`; a blank line separates text blocks.
    pub fn page_text(&self, page_num: usize) -> Result<String> {
        let page_index = PageIndex::try_from_page_num(page_num, self.doc.page_count())?;

        let doc = self.doc.open_document()?;
        let page = doc.load_page(page_index.into()).map_err(|e| {
            Error::PdfTextExtraction {
                page: page_num,
                reason: format!("Failed to load page: {e}"),
            }
        })?;

        let text_page = page.to_text_page(TextPageOptions::empty()).map_err(|e| {
            Error::PdfTextExtraction {
                page: page_num,
                reason: format!("Failed to get text page: {e}"),
            }
        })?;

        let mut all_text = String::new();
        for block in text_page.blocks() {
            if !all_text.is_empty() {
                all_text.push('\n');
            }
            for line in block.lines() {
                for text_char in line.chars() {
                    if let Some(c) = text_char.char() {
                        all_text.push(c);
                    }
                }
                all_text.push('\n');
            }
        }

        Ok(all_text)
    }
}
