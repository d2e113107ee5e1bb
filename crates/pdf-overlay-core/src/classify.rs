//! Document-level scanned/text decision.

use std::fmt;

use tracing::info;

use crate::pdf::PageContent;
use crate::policy::{PageLabel, Stage, settle_or};

/// Pages inspected from the start of the document
pub const SAMPLE_PAGES: usize = 3;

/// Average characters per sampled page below which a document is scanned
pub const SCANNED_THRESHOLD: f64 = 50.0;

/// How text should be obtained from every page of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Image-only pages; OCR is forced
    Scanned,
    /// Pages carry extractable text
    TextBased,
}

impl ScanMode {
    pub const fn is_scanned(self) -> bool {
        matches!(self, Self::Scanned)
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanned => f.write_str("scanned"),
            Self::TextBased => f.write_str("text-based"),
        }
    }
}

/// The decision together with the numbers behind it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub mode: ScanMode,
    pub average_chars: f64,
    pub sampled_pages: usize,
}

/// Samples the first pages of a document and decides once for all pages.
///
/// Mixed documents (a text cover page in front of scans) are judged by their
/// first pages only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageClassifier;

impl PageClassifier {
    pub const fn new() -> Self {
        Self
    }

    /// Classify a document. Never fails: a page whose text cannot be read
    /// counts as 0 characters and an empty document is `Scanned`.
    pub fn classify(&self, doc: &dyn PageContent) -> Classification {
        let sampled_pages = doc.page_count().min(SAMPLE_PAGES);

        let total_chars: usize = (0..sampled_pages)
            .map(|page| {
                settle_or(Stage::Classify, PageLabel(page), doc.page_text(page), String::new)
                    .unwrap_or_default()
                    .trim()
                    .chars()
                    .count()
            })
            .sum();

        #[allow(clippy::cast_precision_loss)]
        let average_chars = if sampled_pages == 0 {
            0.0
        } else {
            total_chars as f64 / sampled_pages as f64
        };

        let mode = if average_chars < SCANNED_THRESHOLD {
            ScanMode::Scanned
        } else {
            ScanMode::TextBased
        };

        info!(
            "Document classified as {mode} ({average_chars:.1} chars/page over {sampled_pages} pages)"
        );

        Classification {
            mode,
            average_chars,
            sampled_pages,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{Error, Result};

    /// In-memory document: one optional text per page (`None` fails extraction).
    pub(crate) struct FakeContent {
        pub pages: Vec<Option<String>>,
    }

    impl FakeContent {
        pub(crate) fn with_texts(texts: &[&str]) -> Self {
            Self {
                pages: texts.iter().map(|t| Some((*t).to_string())).collect(),
            }
        }
    }

    impl PageContent for FakeContent {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, page_num: usize) -> Result<String> {
            self.pages[page_num].clone().ok_or(Error::PdfTextExtraction {
                page: page_num,
                reason: "broken page".to_string(),
            })
        }

        fn render_page_png(&self, _page_num: usize, _scale: f32) -> Result<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
    }

    #[test]
    fn test_text_document() {
        let doc = FakeContent::with_texts(&[&"a".repeat(60), &"b".repeat(60)]);
        let c = PageClassifier::new().classify(&doc);
        assert_eq!(c.mode, ScanMode::TextBased);
        assert_eq!(c.sampled_pages, 2);
        assert!((c.average_chars - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let doc = FakeContent::with_texts(&[&"x".repeat(50)]);
        assert_eq!(PageClassifier::new().classify(&doc).mode, ScanMode::TextBased);

        let doc = FakeContent::with_texts(&[&"x".repeat(49)]);
        assert_eq!(PageClassifier::new().classify(&doc).mode, ScanMode::Scanned);
    }

    #[test]
    fn test_only_first_three_pages_sampled() {
        let long = "y".repeat(500);
        let doc = FakeContent::with_texts(&["", "", "", &long, &long]);
        let c = PageClassifier::new().classify(&doc);
        assert_eq!(c.sampled_pages, 3);
        assert_eq!(c.mode, ScanMode::Scanned);
    }

    #[test]
    fn test_whitespace_is_not_counted() {
        let padded = format!("{}abc{}", " ".repeat(100), "\n".repeat(100));
        let doc = FakeContent::with_texts(&[&padded]);
        let c = PageClassifier::new().classify(&doc);
        assert!((c.average_chars - 3.0).abs() < f64::EPSILON);
        assert!(c.mode.is_scanned());
    }

    #[test]
    fn test_empty_document_is_scanned() {
        let doc = FakeContent { pages: Vec::new() };
        let c = PageClassifier::new().classify(&doc);
        assert_eq!(c.mode, ScanMode::Scanned);
        assert_eq!(c.sampled_pages, 0);
    }

    #[test]
    fn test_failed_page_counts_as_zero() {
        let doc = FakeContent {
            pages: vec![None, Some("z".repeat(120))],
        };
        let c = PageClassifier::new().classify(&doc);
        assert!((c.average_chars - 60.0).abs() < f64::EPSILON);
        assert_eq!(c.mode, ScanMode::TextBased);
    }
}
