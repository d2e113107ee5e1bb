mod traits;
mod retry;
mod llm;
mod gemini;
mod openai;
mod google;
mod null;
mod chain;

pub use traits::{LlmClient, ProviderInfo, ProviderKind, TranslationProvider};
pub use retry::{DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS, RetryPolicy};
pub use llm::{LlmProvider, create_prompt};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use google::StatisticalProvider;
pub use null::NullProvider;
pub use chain::{Translation, TranslationBackend};
