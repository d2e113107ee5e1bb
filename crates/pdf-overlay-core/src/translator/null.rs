use async_trait::async_trait;

use crate::config::Lang;
use crate::error::{Error, Result};
use super::traits::{ProviderInfo, ProviderKind, TranslationProvider};

/// Stands in for a chain with no usable provider; always fails so the
/// caller keeps the original text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

#[async_trait]
impl TranslationProvider for NullProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "none",
            kind: ProviderKind::Null,
        }
    }

    async fn translate(&self, _text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
        Err(Error::TranslationNotConfigured("none"))
    }

    fn is_available(&self) -> bool {
        false
    }
}
