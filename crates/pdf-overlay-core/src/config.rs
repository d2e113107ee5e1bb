use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Source language placeholder meaning "let the provider detect it"
    pub fn auto() -> Self {
        Self::new(AUTO_LANG)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_auto(&self) -> bool {
        self.0 == AUTO_LANG
    }
}

/// Source language code that requests auto-detection
pub const AUTO_LANG: &str = "auto";

// Serde default functions for common languages
fn default_source_lang() -> Lang {
    Lang::auto()
}

fn default_target_lang() -> Lang {
    Lang::new("en")
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Text color for translation overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn dark_red() -> Self {
        Self::new(0.8, 0.0, 0.0)
    }

    pub const fn blue() -> Self {
        Self::new(0.0, 0.0, 0.8)
    }

    pub const fn dark_green() -> Self {
        Self::new(0.0, 0.5, 0.0)
    }

    pub const fn purple() -> Self {
        Self::new(0.5, 0.0, 0.5)
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::blue()
    }
}

/// Where the translated text block is placed on each page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPosition {
    /// Right-hand column, starting near the top
    #[default]
    Right,
    /// Full-width block near the bottom edge
    Bottom,
    /// Full-width block near the top edge
    Top,
}

impl OverlayPosition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Top => "top",
        }
    }
}

impl std::fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OverlayPosition {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "right" => Ok(Self::Right),
            "bottom" => Ok(Self::Bottom),
            "top" => Ok(Self::Top),
            other => Err(crate::error::Error::ConfigInvalid {
                field: "position".to_string(),
                reason: format!("unknown overlay position '{other}'"),
            }),
        }
    }
}

/// Which LLM API serves as the primary translator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Google Gemini `generateContent` API
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions API (llama.cpp, Ollama, OpenAI, ...)
    OpenAi,
}

/// Key value shipped in sample configs; treated as "no key".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GEMINI_API_KEY_HERE";

/// Primary (LLM) translation backend configuration.
///
/// The LLM is only used when a usable API key is present, except for
/// OpenAI-compatible servers with an explicit `api_base` (local servers
/// usually run without a key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,
    pub api_key: Option<String>,
    /// Base URL; only meaningful for OpenAI-compatible servers
    pub api_base: Option<String>,
    /// Model identifier (defaults per provider)
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl LlmConfig {
    /// API key with empty strings and the sample placeholder filtered out
    pub fn usable_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Whether an LLM provider should be placed in the fallback chain
    pub fn is_configured(&self) -> bool {
        match self.provider {
            LlmProviderKind::Gemini => self.usable_key().is_some(),
            LlmProviderKind::OpenAi => self.usable_key().is_some() || self.api_base.is_some(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::default(),
            api_key: None,
            api_base: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Fallback (statistical machine translation) backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_statistical_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_statistical_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_statistical_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// OCR configuration for scanned pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Tesseract language packs used simultaneously
    #[serde(default = "default_ocr_languages")]
    pub languages: Vec<String>,
    /// Linear rasterization scale before OCR
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
    /// OCR executable name or path
    #[serde(default = "default_ocr_binary")]
    pub binary: String,
}

fn default_ocr_languages() -> Vec<String> {
    crate::ocr::DEFAULT_OCR_LANGUAGES.iter().map(ToString::to_string).collect()
}

const fn default_render_scale() -> f32 {
    2.0
}

fn default_ocr_binary() -> String {
    "tesseract".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_ocr_languages(),
            render_scale: default_render_scale(),
            binary: default_ocr_binary(),
        }
    }
}

/// Translation cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Maximum memory cache entries
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,

    /// Enable disk cache
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to ~/.cache/pdf-overlay)
    pub disk_path: Option<PathBuf>,

    /// Entry lifetime in days (0 = no expiry)
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_entries() -> u64 {
    1000
}

const fn default_ttl_days() -> u64 {
    30
}

impl CacheConfig {
    /// Configuration with both layers switched off
    pub const fn disabled() -> Self {
        Self {
            memory_enabled: false,
            memory_max_entries: 0,
            disk_enabled: false,
            disk_path: None,
            ttl_days: 0,
        }
    }

    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_days.saturating_mul(24 * 60 * 60)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_entries: default_memory_max_entries(),
            disk_enabled: true,
            disk_path: None,
            ttl_days: default_ttl_days(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language ("auto" to detect)
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Overlay placement
    #[serde(default)]
    pub position: OverlayPosition,

    /// Overlay text color
    #[serde(default)]
    pub text_color: TextColor,

    /// Primary translator
    #[serde(default)]
    pub llm: LlmConfig,

    /// Fallback translator
    #[serde(default)]
    pub statistical: StatisticalConfig,

    /// OCR settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            position: OverlayPosition::default(),
            text_color: TextColor::default(),
            llm: LlmConfig::default(),
            statistical: StatisticalConfig::default(),
            ocr: OcrConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Prefix for environment overrides, e.g. `PDF_OVERLAY_TARGET_LANG=de`
/// or `PDF_OVERLAY_LLM__API_KEY=...`
pub const ENV_PREFIX: &str = "PDF_OVERLAY";

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, crate::error::Error> {
        toml::from_str(content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })
    }

    /// Load from default locations (~/.config/pdf-overlay/config.toml, ./config.toml)
    /// with `PDF_OVERLAY_*` environment overrides layered on top.
    ///
    /// Falls back to defaults when the layered sources cannot be merged.
    pub fn load() -> Self {
        let mut builder = ::config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-overlay").join("config.toml");
            builder = builder.add_source(::config::File::from(user_config).required(false));
        }

        let loaded = builder
            .add_source(::config::File::with_name("config").required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|layered| layered.try_deserialize::<Self>());

        match loaded {
            Ok(config) => {
                tracing::debug!("Loaded layered configuration");
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.source_lang.is_auto());
        assert_eq!(config.target_lang.as_str(), "en");
        assert_eq!(config.position, OverlayPosition::Right);
        assert_eq!(config.text_color, TextColor::blue());
        assert_eq!(config.ocr.languages, vec!["eng", "deu", "fra", "spa"]);
        assert!((config.ocr.render_scale - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.cache.ttl_days, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            target_lang = "de"
            position = "bottom"

            [llm]
            provider = "openai"
            api_base = "http://localhost:8080/v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.target_lang.as_str(), "de");
        assert_eq!(config.position, OverlayPosition::Bottom);
        assert_eq!(config.llm.provider, LlmProviderKind::OpenAi);
        assert_eq!(config.llm.retry_count, 3);
        assert!(config.statistical.enabled);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = AppConfig::from_toml("position = 12");
        assert!(matches!(result, Err(crate::error::Error::ConfigLoad(_))));
    }

    #[test]
    fn test_placeholder_key_is_not_usable() {
        let mut llm = LlmConfig {
            api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            ..Default::default()
        };
        assert!(llm.usable_key().is_none());
        assert!(!llm.is_configured());

        llm.api_key = Some("   ".to_string());
        assert!(!llm.is_configured());

        llm.api_key = Some("abc123".to_string());
        assert_eq!(llm.usable_key(), Some("abc123"));
        assert!(llm.is_configured());
    }

    #[test]
    fn test_openai_without_key_needs_base() {
        let mut llm = LlmConfig {
            provider: LlmProviderKind::OpenAi,
            ..Default::default()
        };
        assert!(!llm.is_configured());
        llm.api_base = Some("http://localhost:11434/v1".to_string());
        assert!(llm.is_configured());
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!("RIGHT".parse::<OverlayPosition>().unwrap(), OverlayPosition::Right);
        assert_eq!("bottom".parse::<OverlayPosition>().unwrap(), OverlayPosition::Bottom);
        assert_eq!(" top ".parse::<OverlayPosition>().unwrap(), OverlayPosition::Top);
        assert!("left".parse::<OverlayPosition>().is_err());
    }
}
