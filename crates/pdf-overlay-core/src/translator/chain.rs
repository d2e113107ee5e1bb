use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CacheKey, TranslationCache};
use crate::config::{AppConfig, Lang, LlmConfig, LlmProviderKind};
use crate::error::{Error, Result};
use crate::util::is_blank;
use super::gemini::GeminiClient;
use super::google::StatisticalProvider;
use super::llm::LlmProvider;
use super::null::NullProvider;
use super::openai::OpenAiClient;
use super::retry::RetryPolicy;
use super::traits::{LlmClient, TranslationProvider};

/// Result of a translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Provider that produced `text`; `None` when the input was passed through
    pub provider: Option<&'static str>,
    pub from_cache: bool,
}

impl Translation {
    fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            provider: None,
            from_cache: false,
        }
    }
}

/// Ordered fallback chain of translation providers with an optional cache
/// in front.
pub struct TranslationBackend {
    providers: Vec<Arc<dyn TranslationProvider>>,
    cache: Option<TranslationCache>,
}

impl TranslationBackend {
    /// Chain trying `providers` in order. An empty list becomes a single
    /// [`NullProvider`].
    pub fn new(providers: Vec<Arc<dyn TranslationProvider>>) -> Self {
        let providers = if providers.is_empty() {
            vec![Arc::new(NullProvider) as Arc<dyn TranslationProvider>]
        } else {
            providers
        };
        Self {
            providers,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// LLM first when configured, then the statistical service when enabled.
    ///
    /// A cache that cannot be opened (e.g. locked by another process) is
    /// logged and skipped.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut providers: Vec<Arc<dyn TranslationProvider>> = Vec::new();

        if config.llm.is_configured() {
            let client = llm_client(&config.llm)?;
            info!("{} LLM translation enabled", client.name());
            providers.push(Arc::new(LlmProvider::new(client)));
        } else {
            info!("No LLM API key configured, LLM translation disabled");
        }

        if config.statistical.enabled {
            providers.push(Arc::new(StatisticalProvider::from_config(&config.statistical)?));
        }

        let mut backend = Self::new(providers);
        info!("Translation chain: {}", backend.describe());

        if config.cache.memory_enabled || config.cache.disk_enabled {
            match TranslationCache::new(&config.cache) {
                Ok(cache) => backend = backend.with_cache(cache),
                Err(e) => warn!("Translation cache disabled: {e}"),
            }
        }

        Ok(backend)
    }

    /// Provider names in fallback order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Providers in fallback order with their role, e.g.
    /// `Gemini (llm) > Google Translate (statistical)`
    pub fn describe(&self) -> String {
        self.providers
            .iter()
            .map(|p| {
                let info = p.info();
                format!("{} ({})", info.name, info.kind)
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// Forget every cached translation. Returns `false` when there is no
    /// cache to clear.
    pub fn clear_cache(&self) -> bool {
        let Some(ref cache) = self.cache else {
            return false;
        };
        cache.clear();
        true
    }

    /// Whether any provider can actually translate
    pub fn has_available_provider(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    fn chain_id(&self) -> String {
        self.provider_names().join(">")
    }

    /// Translate `text`, trying each provider in turn.
    ///
    /// Blank text is returned as-is without touching the cache or any
    /// provider. Fails with [`Error::TranslationExhausted`] when no provider
    /// succeeds.
    pub async fn try_translate(
        &self,
        text: &str,
        target: &Lang,
        source: &Lang,
    ) -> Result<Translation> {
        if is_blank(text) {
            return Ok(Translation::passthrough(text));
        }

        let key = CacheKey::new(&self.chain_id(), source, target, text);
        if let Some(ref cache) = self.cache
            && let Some(cached) = cache.get(&key).await
        {
            debug!("Translation cache hit ({} chars)", text.chars().count());
            return Ok(Translation {
                text: cached,
                provider: None,
                from_cache: true,
            });
        }

        let mut attempted = 0;
        for provider in &self.providers {
            if !provider.is_available() {
                debug!("Skipping unavailable provider {}", provider.name());
                continue;
            }
            attempted += 1;

            match provider.translate(text, source, target).await {
                Ok(translated) => {
                    if let Some(ref cache) = self.cache {
                        cache.insert(&key, &translated).await;
                    }
                    return Ok(Translation {
                        text: translated,
                        provider: Some(provider.name()),
                        from_cache: false,
                    });
                }
                Err(e) => warn!(
                    "{} translation failed: {e}, trying next provider",
                    provider.name()
                ),
            }
        }

        Err(Error::TranslationExhausted { attempted })
    }

    /// Translate `text`, returning it unchanged when every provider fails.
    pub async fn translate(&self, text: &str, target: &Lang, source: &Lang) -> String {
        match self.try_translate(text, target, source).await {
            Ok(translation) => translation.text,
            Err(e) => {
                warn!("No translation service available ({e}), returning original text");
                text.to_string()
            }
        }
    }
}

impl std::fmt::Debug for TranslationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationBackend")
            .field("providers", &self.provider_names())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

fn llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let retry = RetryPolicy::new(config.retry_count, config.retry_delay_ms);
    let key = config.usable_key().map(str::to_string);

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProviderKind::Gemini => {
            let key = key.ok_or(Error::TranslationMissingApiKey)?;
            let mut client = GeminiClient::new(key, timeout)?.with_retry(retry);
            if let Some(ref model) = config.model {
                client = client.with_model(model.clone());
            }
            if let Some(ref base) = config.api_base {
                client = client.with_base_url(base.clone());
            }
            Arc::new(client)
        }
        LlmProviderKind::OpenAi => Arc::new(
            OpenAiClient::new(config.api_base.clone(), key, config.model.clone(), timeout)?
                .with_retry(retry),
        ),
    };
    Ok(client)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::CacheConfig;
    use crate::translator::traits::{ProviderInfo, ProviderKind};

    struct CountingProvider {
        name: &'static str,
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn ok(name: &'static str, reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: Some(reply),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationProvider for CountingProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: self.name,
                kind: ProviderKind::Llm,
            }
        }

        async fn translate(&self, _text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| Error::TranslationRequest("HTTP 500".to_string()))
        }
    }

    fn de() -> Lang {
        Lang::new("de")
    }

    fn chain(providers: &[&Arc<CountingProvider>]) -> TranslationBackend {
        TranslationBackend::new(
            providers
                .iter()
                .map(|p| (*p).clone() as Arc<dyn TranslationProvider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_blank_text_skips_providers() {
        let llm = CountingProvider::ok("llm", "x");
        let backend = chain(&[&llm]);

        for blank in ["", "   ", "\n\t"] {
            let got = backend.try_translate(blank, &de(), &Lang::auto()).await.unwrap();
            assert_eq!(got.text, blank);
            assert_eq!(got.provider, None);
        }
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_wins() {
        let llm = CountingProvider::ok("llm", "Hallo Welt");
        let stat = CountingProvider::ok("stat", "Hallo Welt (stat)");
        let backend = chain(&[&llm, &stat]);

        let got = backend.try_translate("Hello world", &de(), &Lang::auto()).await.unwrap();
        assert_eq!(got.text, "Hallo Welt");
        assert_eq!(got.provider, Some("llm"));
        assert_eq!(stat.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let llm = CountingProvider::failing("llm");
        let stat = CountingProvider::ok("stat", "Hallo Welt");
        let backend = chain(&[&llm, &stat]);

        let got = backend.try_translate("Hello world", &de(), &Lang::auto()).await.unwrap();
        assert_eq!(got.provider, Some("stat"));
        assert_eq!((llm.calls(), stat.calls()), (1, 1));
    }

    #[tokio::test]
    async fn test_all_failing_returns_original() {
        let backend = chain(&[
            &CountingProvider::failing("llm"),
            &CountingProvider::failing("stat"),
        ]);

        let err = backend.try_translate("Hello", &de(), &Lang::auto()).await.unwrap_err();
        assert!(matches!(err, Error::TranslationExhausted { attempted: 2 }));
        assert_eq!(backend.translate("Hello", &de(), &Lang::auto()).await, "Hello");
    }

    #[tokio::test]
    async fn test_empty_chain_uses_null_provider() {
        let backend = TranslationBackend::new(Vec::new());
        assert_eq!(backend.provider_names(), vec!["none"]);
        assert!(!backend.has_available_provider());

        let err = backend.try_translate("Hello", &de(), &Lang::auto()).await.unwrap_err();
        assert!(matches!(err, Error::TranslationExhausted { attempted: 0 }));
        assert_eq!(backend.translate("Hello", &de(), &Lang::auto()).await, "Hello");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_providers() {
        let llm = CountingProvider::ok("llm", "Hallo");
        let backend = chain(&[&llm])
            .with_cache(TranslationCache::in_memory(16));

        let first = backend.try_translate("Hello", &de(), &Lang::auto()).await.unwrap();
        let second = backend.try_translate("Hello", &de(), &Lang::auto()).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.text, "Hallo");
        assert_eq!(llm.calls(), 1);

        // Another target language is a different entry
        backend.try_translate("Hello", &Lang::new("fr"), &Lang::auto()).await.unwrap();
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_forgets_translations() {
        let llm = CountingProvider::ok("llm", "Hallo");
        let backend = chain(&[&llm]).with_cache(TranslationCache::in_memory(16));

        assert_eq!(backend.translate("Hello", &de(), &Lang::auto()).await, "Hallo");
        assert!(backend.clear_cache());
        let again = backend.try_translate("Hello", &de(), &Lang::auto()).await.unwrap();
        assert!(!again.from_cache);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = chain(&[&CountingProvider::failing("llm")])
            .with_cache(TranslationCache::in_memory(16));
        assert_eq!(backend.translate("Hello", &de(), &Lang::auto()).await, "Hello");
        assert!(backend.try_translate("Hello", &de(), &Lang::auto()).await.is_err());
    }

    #[test]
    fn test_from_config_without_key_uses_statistical_only() {
        let mut config = AppConfig::default();
        config.cache = CacheConfig::disabled();
        config.llm.api_key = Some(crate::config::PLACEHOLDER_API_KEY.to_string());

        let backend = TranslationBackend::from_config(&config).unwrap();
        assert_eq!(backend.provider_names(), vec!["Google Translate"]);
    }

    #[test]
    fn test_from_config_with_key_puts_llm_first() {
        let mut config = AppConfig::default();
        config.cache = CacheConfig::disabled();
        config.llm.api_key = Some("real-key".to_string());

        let backend = TranslationBackend::from_config(&config).unwrap();
        assert_eq!(backend.provider_names(), vec!["Gemini", "Google Translate"]);
        assert_eq!(backend.describe(), "Gemini (llm) > Google Translate (statistical)");
    }

    #[test]
    fn test_from_config_everything_off() {
        let mut config = AppConfig::default();
        config.cache = CacheConfig::disabled();
        config.statistical.enabled = false;

        let backend = TranslationBackend::from_config(&config).unwrap();
        assert_eq!(backend.provider_names(), vec!["none"]);
        assert_eq!(backend.describe(), "none (none)");
        assert!(!backend.clear_cache());
    }
}
