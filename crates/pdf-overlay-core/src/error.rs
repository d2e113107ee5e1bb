use thiserror::Error;

/// Unified error type for pdf-overlay-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - PDF operations (opening, reading, rendering, overlay insertion, saving)
/// - OCR of rasterized pages
/// - Translation operations (API requests, responses, rate limiting, fallback)
/// - Form field reading and filling
/// - Cache and configuration operations
/// - General I/O operations
///
/// Whether a given error aborts a run or is absorbed is decided by
/// [`crate::policy::Stage`], not by the variant itself.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to extract text from a PDF page
    #[error("failed to extract text from page {page}: {reason}")]
    PdfTextExtraction { page: usize, reason: String },

    /// Failed to render a PDF page
    #[error("failed to render page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    /// Failed to insert overlay text into a page
    #[error("failed to insert overlay text: {0}")]
    PdfOverlay(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // OCR Errors
    // ==========================================================================
    /// The OCR engine failed or is not installed
    #[error("OCR failed: {0}")]
    Ocr(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// API key not configured for translation service
    #[error("translation API key not configured")]
    TranslationMissingApiKey,

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    /// The provider is a placeholder for a backend that is not configured
    #[error("translation provider '{0}' is not configured")]
    TranslationNotConfigured(&'static str),

    /// Every provider in the fallback chain failed or was absent
    #[error("no translation provider succeeded ({attempted} tried)")]
    TranslationExhausted { attempted: usize },

    // ==========================================================================
    // Form Errors
    // ==========================================================================
    /// Form fill requested with no values
    #[error("no fill data supplied")]
    FormFillEmpty,

    /// No form field backend is available in this build/configuration
    #[error("form field backend unavailable")]
    FormBackendUnavailable,

    /// Failed to read the form field tree
    #[error("failed to read form fields: {0}")]
    FormRead(String),

    /// Failed to write a single form field
    #[error("failed to fill field '{field}': {reason}")]
    FormField { field: String, reason: String },

    /// Fill-data file could not be read or parsed
    #[error("invalid fill data: {0}")]
    FillData(String),

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
