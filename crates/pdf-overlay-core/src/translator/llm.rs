use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::Lang;
use crate::error::{Error, Result};
use super::traits::{LlmClient, ProviderInfo, ProviderKind, TranslationProvider};

/// Primary translator: prompts an LLM for a faithful translation.
pub struct LlmProvider {
    client: Arc<dyn LlmClient>,
}

impl LlmProvider {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

/// Build the translation prompt.
///
/// The model is asked to keep formatting and to hand back text that is
/// already in the target language unchanged.
pub fn create_prompt(text: &str, source: &Lang, target: &Lang) -> String {
    let target_name = describe_language(target);
    let source_hint = if source.is_auto() {
        String::new()
    } else {
        format!(" from {}", describe_language(source))
    };

    format!(
        "Translate the following text{source_hint} accurately to {target_name}.\n\
         Preserve formatting, structure, and meaning.\n\
         If the text is already in {target_name}, return it unchanged.\n\
         \n\
         Text to translate:\n\
         {text}\n\
         \n\
         Translation:"
    )
}

#[async_trait]
impl TranslationProvider for LlmProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.client.name(),
            kind: ProviderKind::Llm,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        let prompt = create_prompt(text, source, target);
        let response = self.client.generate_content(&prompt).await?;

        let translated = response.trim();
        if translated.is_empty() {
            return Err(Error::TranslationInvalidResponse(format!(
                "{} returned an empty translation",
                self.client.name()
            )));
        }

        info!(
            "{} translation: {} chars -> {} chars",
            self.client.name(),
            text.chars().count(),
            translated.chars().count()
        );
        Ok(translated.to_string())
    }
}

/// Language name with its code for prompts, e.g. `German (de)`.
/// Codes without a known name are passed through.
fn describe_language(lang: &Lang) -> String {
    language_name(lang).map_or_else(
        || lang.as_str().to_string(),
        |name| format!("{name} ({})", lang.as_str()),
    )
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> Option<&'static str> {
    let name = match lang.as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "th" => "Thai",
        "vi" => "Vietnamese",
        _ => return None,
    };
    Some(name)
}
