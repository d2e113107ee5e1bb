use async_trait::async_trait;
use crate::config::Lang;
use crate::error::Result;

/// Role a provider plays in the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Prompted large language model
    Llm,
    /// Statistical / neural machine translation service
    Statistical,
    /// Placeholder that never translates
    Null,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Llm => "llm",
            Self::Statistical => "statistical",
            Self::Null => "none",
        };
        f.write_str(label)
    }
}

/// Information about a translation provider
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Human-readable name
    pub name: &'static str,
    pub kind: ProviderKind,
}

/// One link of the translation fallback chain
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Get information about this provider
    fn info(&self) -> ProviderInfo;

    /// Get the provider name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate text from source language to target language
    async fn translate(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
    ) -> Result<String>;

    /// Check if the provider can be used (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}

/// A text-in/text-out LLM endpoint
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send a single user prompt and return the model's text answer
    async fn generate_content(&self, prompt: &str) -> Result<String>;
}
