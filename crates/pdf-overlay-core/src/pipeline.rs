//! End-to-end processing of one document: classify, extract, translate,
//! overlay, save, then optionally fill form fields.

use std::path::Path;
use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::classify::{Classification, PageClassifier};
use crate::config::{AppConfig, Lang, OverlayPosition};
use crate::error::{Error, Result};
use crate::extract::{ExtractionMethod, TextExtractor};
use crate::forms::{FillData, FillReport, FormFieldBackend, FormFiller};
use crate::ocr::OcrEngine;
use crate::pdf::{OverlayOptions, OverlayRenderer, PdfDocument};
use crate::policy::{PageLabel, Stage, escalate, settle};
use crate::translator::TranslationBackend;
use crate::util::is_blank;

/// Called after each page with `(pages_done, total_pages)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// What happened to one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Extraction produced no text
    NoText,
    /// Translation failed or returned the text unchanged
    Unchanged,
    Translated {
        /// `None` for a cache hit
        provider: Option<&'static str>,
        from_cache: bool,
        overlay_lines: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    /// 0-based page index
    pub page: usize,
    /// `None` when extraction failed
    pub method: Option<ExtractionMethod>,
    pub outcome: PageOutcome,
}

/// Observations from a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub classification: Classification,
    pub pages: Vec<PageReport>,
    /// `None` when no fill was requested or the fill failed
    pub fill: Option<FillReport>,
}

impl ProcessReport {
    pub fn translated_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::Translated { .. }))
            .count()
    }

    pub fn ocr_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.method == Some(ExtractionMethod::Ocr))
            .count()
    }
}

/// Builder for [`Pipeline`]. Components not supplied are built from the
/// configuration.
pub struct PipelineBuilder {
    config: AppConfig,
    translator: Option<TranslationBackend>,
    ocr: Option<Arc<dyn OcrEngine>>,
    form_backend: Option<Arc<dyn FormFieldBackend>>,
    progress: Option<ProgressCallback>,
}

impl PipelineBuilder {
    #[must_use]
    pub fn with_translator(mut self, translator: TranslationBackend) -> Self {
        self.translator = Some(translator);
        self
    }

    #[must_use]
    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    #[must_use]
    pub fn with_form_backend(mut self, backend: Arc<dyn FormFieldBackend>) -> Self {
        self.form_backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let translator = match self.translator {
            Some(translator) => translator,
            None => TranslationBackend::from_config(&self.config)?,
        };

        let extractor = match self.ocr {
            Some(ocr) => TextExtractor::new(ocr, self.config.ocr.languages.clone())
                .with_render_scale(self.config.ocr.render_scale),
            None => TextExtractor::from_config(&self.config.ocr),
        };

        let filler = self
            .form_backend
            .map_or_else(FormFiller::default, FormFiller::new);

        let overlay = OverlayRenderer::new(OverlayOptions {
            text_color: self.config.text_color,
            ..Default::default()
        });

        if !translator.has_available_provider() {
            warn!("No translation provider available, pages keep their original text");
        }

        debug!(
            "Pipeline: providers {}, {:?}, form backend {}",
            translator.describe(),
            extractor,
            filler.backend_name()
        );

        Ok(Pipeline {
            config: self.config,
            classifier: PageClassifier::new(),
            extractor,
            translator,
            overlay,
            filler,
            progress: self.progress,
        })
    }
}

/// Translates a PDF page by page as an overlay and fills its form fields.
pub struct Pipeline {
    config: AppConfig,
    classifier: PageClassifier,
    extractor: TextExtractor,
    translator: TranslationBackend,
    overlay: OverlayRenderer,
    filler: FormFiller,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    pub fn builder(config: AppConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            translator: None,
            ocr: None,
            form_backend: None,
            progress: None,
        }
    }

    /// Process `input` into `output`.
    ///
    /// Only opening the input and saving the output can fail the run; every
    /// other fault is logged and the affected page or fill is skipped. A
    /// failed fill leaves the translated output untouched.
    pub async fn process(
        &self,
        input: &Path,
        output: &Path,
        target: &Lang,
        fill_data: Option<&FillData>,
        position: OverlayPosition,
    ) -> Result<ProcessReport> {
        let span = info_span!(
            "process",
            input = %input.display(),
            output = %output.display(),
            target = %target,
        );

        self.process_document(input, output, target, fill_data, position)
            .instrument(span)
            .await
    }

    /// [`Pipeline::process`], reduced to success or failure.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        target: &Lang,
        fill_data: Option<&FillData>,
        position: OverlayPosition,
    ) -> bool {
        match self.process(input, output, target, fill_data, position).await {
            Ok(report) => {
                info!(
                    "Processed {} pages ({} translated, {} via OCR)",
                    report.pages.len(),
                    report.translated_pages(),
                    report.ocr_pages()
                );
                true
            }
            Err(e) => {
                error!("Processing failed: {e}");
                false
            }
        }
    }

    async fn process_document(
        &self,
        input: &Path,
        output: &Path,
        target: &Lang,
        fill_data: Option<&FillData>,
        position: OverlayPosition,
    ) -> Result<ProcessReport> {
        let mut doc = escalate(Stage::Open, input.display(), PdfDocument::open(input))?;
        let total = doc.page_count();
        info!("Opened {} ({total} pages)", input.display());

        let classification = self.classifier.classify(&doc);
        let force_ocr = classification.mode.is_scanned();

        let mut pages = Vec::with_capacity(total);
        for page in 0..total {
            let report = self
                .process_page(&mut doc, page, target, position, force_ocr)
                .instrument(info_span!("page", number = page + 1))
                .await?;
            pages.push(report);

            if let Some(ref progress) = self.progress {
                progress(page + 1, total);
            }
        }

        escalate(Stage::Save, output.display(), doc.save(output))?;
        drop(doc);
        info!("Saved {}", output.display());

        let fill = match fill_data {
            Some(data) if !data.is_empty() => {
                settle(Stage::FormFill, output.display(), self.fill_in_place(output, data))?
            }
            _ => None,
        };

        Ok(ProcessReport {
            classification,
            pages,
            fill,
        })
    }

    async fn process_page(
        &self,
        doc: &mut PdfDocument,
        page: usize,
        target: &Lang,
        position: OverlayPosition,
        force_ocr: bool,
    ) -> Result<PageReport> {
        let label = PageLabel(page);

        let extracted = settle(
            Stage::Extract,
            label,
            self.extractor.extract(&*doc, page, force_ocr),
        )?;
        let method = extracted.as_ref().map(|e| e.method);
        let text = extracted.map(|e| e.text).unwrap_or_default();

        if is_blank(&text) {
            info!("No text found on {label}");
            return Ok(PageReport {
                page,
                method,
                outcome: PageOutcome::NoText,
            });
        }

        let translation = settle(
            Stage::Translate,
            label,
            self.translator
                .try_translate(&text, target, &self.config.source_lang)
                .await,
        )?;

        let Some(translation) = translation.filter(|t| t.text != text) else {
            debug!("{label} left unchanged");
            return Ok(PageReport {
                page,
                method,
                outcome: PageOutcome::Unchanged,
            });
        };

        let overlay_lines = match settle(Stage::Overlay, label, doc.page_canvas(page))? {
            Some(mut canvas) => {
                self.overlay
                    .render(&mut canvas, &translation.text, position)
                    .lines_written
            }
            None => 0,
        };

        info!(
            "Translated {label} via {} ({overlay_lines} overlay lines)",
            translation.provider.unwrap_or("cache")
        );

        Ok(PageReport {
            page,
            method,
            outcome: PageOutcome::Translated {
                provider: translation.provider,
                from_cache: translation.from_cache,
                overlay_lines,
            },
        })
    }

    /// Fill `path`'s form fields through a temp file next to it, replacing
    /// `path` only once the filled copy is completely written.
    fn fill_in_place(&self, path: &Path, data: &FillData) -> Result<FillReport> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".temp")
            .tempfile_in(dir)?;

        let report = self.filler.fill(path, temp.path(), data)?;
        // The temp file is created 0600; the output keeps its own mode
        std::fs::set_permissions(temp.path(), std::fs::metadata(path)?.permissions())?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(report)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("translator", &self.translator)
            .field("extractor", &self.extractor)
            .field("filler", &self.filler)
            .finish_non_exhaustive()
    }
}
