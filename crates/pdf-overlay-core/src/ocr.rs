//! OCR of rasterized pages.

use std::io::Write;
use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Default OCR languages (tesseract codes)
pub const DEFAULT_OCR_LANGUAGES: [&str; 4] = ["eng", "deu", "fra", "spa"];

/// Recognizes text in a page image.
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Recognize text in a PNG image using the given language codes.
    fn image_to_string(&self, png: &[u8], languages: &[String]) -> Result<String>;
}

/// The `tesseract` command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Join language codes the way tesseract's `-l` expects (`eng+deu`).
pub fn language_arg(languages: &[String]) -> String {
    let joined = languages
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("+");
    if joined.is_empty() {
        DEFAULT_OCR_LANGUAGES.join("+")
    } else {
        joined
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn image_to_string(&self, png: &[u8], languages: &[String]) -> Result<String> {
        let mut image = tempfile::Builder::new()
            .prefix("pdf-overlay-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| Error::Ocr(format!("failed to create scratch image: {e}")))?;
        image
            .write_all(png)
            .and_then(|()| image.flush())
            .map_err(|e| Error::Ocr(format!("failed to write scratch image: {e}")))?;

        let langs = language_arg(languages);
        debug!("Running {} on {} bytes (-l {langs})", self.binary, png.len());

        let output = Command::new(&self.binary)
            .arg(image.path())
            .arg("stdout")
            .arg("-l")
            .arg(&langs)
            .output()
            .map_err(|e| {
                Error::Ocr(format!("failed to run {} (is it installed?): {e}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Ocr(format!("{} failed: {}", self.binary, stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
