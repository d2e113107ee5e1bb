//! PDF Overlay Core Library
//!
//! This library provides the core functionality for translating PDF documents
//! in place and filling their forms:
//! - Scanned/text classification and per-page text extraction (direct or OCR)
//! - Translation through an LLM with a statistical fallback
//! - Caching (memory and disk)
//! - Translated text drawn as an overlay onto the original pages
//! - AcroForm text-field filling with an atomic replace of the output

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod forms;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod policy;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, TranslationCache};
pub use classify::{Classification, PageClassifier, ScanMode};
pub use config::{AppConfig, Lang, LlmProviderKind, OverlayPosition, TextColor};
pub use error::{Error, Result};
pub use extract::{Extracted, ExtractionMethod, TextExtractor};
pub use forms::{
    FillData, FillReport, FormFieldBackend, FormFiller, LopdfFormBackend, UnavailableFormBackend,
    load_fill_data,
};
pub use ocr::{OcrEngine, TesseractOcr};
pub use pdf::{OverlayOptions, OverlayRenderer, PageContent, PdfDocument, TextSurface};
pub use pipeline::{PageOutcome, PageReport, Pipeline, PipelineBuilder, ProcessReport};
pub use policy::Stage;
pub use translator::{Translation, TranslationBackend, TranslationProvider};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.source_lang.is_auto());
        assert_eq!(config.target_lang.as_str(), "en");
        assert_eq!(config.position, OverlayPosition::Right);
    }
}
