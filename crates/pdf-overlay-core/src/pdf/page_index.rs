//! Page index newtype bridging the 0-based `usize` page numbers used by the
//! pipeline, mupdf's `i32` indices and lopdf's 1-based `u32` page numbers.

use std::fmt;

use crate::error::Error;

/// A validated, 0-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Validate `page_num` against the document's page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PdfInvalidPage {
                page: page_num,
                total: total_pages,
            });
        }

        let index = i32::try_from(page_num).map_err(|_| Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        })?;

        Ok(Self(index))
    }

    /// 1-based page number as used by `lopdf::Document::get_pages`.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        // Non-negative by construction
        (self.0 + 1).cast_unsigned()
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_index() {
        let idx = PageIndex::try_from_page_num(2, 3).unwrap();
        assert_eq!(i32::from(idx), 2);
        assert_eq!(idx.as_lopdf_page_number(), 3);
    }

    #[test]
    fn test_out_of_range() {
        let err = PageIndex::try_from_page_num(3, 3).unwrap_err();
        assert!(matches!(err, Error::PdfInvalidPage { page: 3, total: 3 }));
    }

    #[test]
    fn test_empty_document_has_no_valid_index() {
        assert!(PageIndex::try_from_page_num(0, 0).is_err());
    }
}
