//! Per-page text extraction: direct text first, OCR when needed.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::OcrConfig;
use crate::error::Result;
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::pdf::{DEFAULT_RENDER_SCALE, PageContent};
use crate::util::is_blank;

/// Where a page's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Direct,
    Ocr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Ocr => f.write_str("ocr"),
        }
    }
}

/// Text of one page. May be empty: a blank page is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub method: ExtractionMethod,
}

/// Chooses between direct extraction and rasterize-then-OCR.
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    languages: Vec<String>,
    render_scale: f32,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, languages: Vec<String>) -> Self {
        Self {
            ocr,
            languages,
            render_scale: DEFAULT_RENDER_SCALE,
        }
    }

    /// Extractor with a tesseract engine configured from `config`.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(Arc::new(TesseractOcr::new(config.binary.clone())), config.languages.clone())
            .with_render_scale(config.render_scale)
    }

    #[must_use]
    pub const fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    /// Extract the text of `page_num`.
    ///
    /// Unless `force_ocr` is set, direct text wins when it has any
    /// non-whitespace content and is returned untrimmed. Otherwise the page is
    /// rendered and OCR'd.
    pub fn extract(
        &self,
        doc: &dyn PageContent,
        page_num: usize,
        force_ocr: bool,
    ) -> Result<Extracted> {
        if !force_ocr {
            let text = doc.page_text(page_num)?;
            if !is_blank(&text) {
                return Ok(Extracted {
                    text,
                    method: ExtractionMethod::Direct,
                });
            }
            debug!("Page {} has no direct text, falling back to OCR", page_num + 1);
        }

        let png = doc.render_page_png(page_num, self.render_scale)?;
        let text = self.ocr.image_to_string(&png, &self.languages)?;
        debug!(
            "{} read {} chars from page {}",
            self.ocr.name(),
            text.chars().count(),
            page_num + 1
        );

        Ok(Extracted {
            text,
            method: ExtractionMethod::Ocr,
        })
    }
}

impl fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextExtractor")
            .field("ocr", &self.ocr.name())
            .field("languages", &self.languages)
            .field("render_scale", &self.render_scale)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::classify::tests::FakeContent;
    use crate::error::Error;

    /// OCR stub recording every call.
    #[derive(Default)]
    struct CountingOcr {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    impl OcrEngine for CountingOcr {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn image_to_string(&self, _png: &[u8], languages: &[String]) -> Result<String> {
            self.calls.lock().unwrap().push(languages.to_vec());
            if self.fail {
                Err(Error::Ocr("no engine".to_string()))
            } else {
                Ok("Bonjour".to_string())
            }
        }
    }

    fn extractor(ocr: &Arc<CountingOcr>) -> TextExtractor {
        let langs = ["eng", "deu", "fra", "spa"].map(String::from).to_vec();
        TextExtractor::new(ocr.clone(), langs)
    }

    #[test]
    fn test_direct_text_skips_ocr() {
        let ocr = Arc::new(CountingOcr::default());
        let doc = FakeContent::with_texts(&["  Hello world\n"]);
        let got = extractor(&ocr).extract(&doc, 0, false).unwrap();

        assert_eq!(got.text, "  Hello world\n");
        assert_eq!(got.method, ExtractionMethod::Direct);
        assert!(ocr.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blank_text_falls_back_to_ocr() {
        let ocr = Arc::new(CountingOcr::default());
        let doc = FakeContent::with_texts(&[" \n "]);
        let got = extractor(&ocr).extract(&doc, 0, false).unwrap();

        assert_eq!(got.text, "Bonjour");
        assert_eq!(got.method, ExtractionMethod::Ocr);
        let calls = ocr.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].join("+"), "eng+deu+fra+spa");
    }

    #[test]
    fn test_forced_ocr_ignores_direct_text() {
        let ocr = Arc::new(CountingOcr::default());
        let doc = FakeContent::with_texts(&["plenty of text"]);
        let got = extractor(&ocr).extract(&doc, 0, true).unwrap();

        assert_eq!(got.method, ExtractionMethod::Ocr);
        assert_eq!(ocr.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_ocr_failure_is_returned() {
        let ocr = Arc::new(CountingOcr {
            fail: true,
            ..CountingOcr::default()
        });
        let doc = FakeContent::with_texts(&[""]);
        let err = extractor(&ocr).extract(&doc, 0, false).unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }

    #[test]
    fn test_direct_failure_is_returned() {
        let ocr = Arc::new(CountingOcr::default());
        let doc = FakeContent { pages: vec![None] };
        let err = extractor(&ocr).extract(&doc, 0, false).unwrap_err();
        assert!(matches!(err, Error::PdfTextExtraction { page: 0, .. }));
        assert!(ocr.calls.lock().unwrap().is_empty());
    }
}
