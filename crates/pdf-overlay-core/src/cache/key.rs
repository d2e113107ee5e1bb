use crate::config::Lang;

/// Cache key for a translated text.
///
/// Keys are opaque MD5 hashes of all relevant inputs, ensuring:
/// - Same text + languages + provider chain = same key
/// - Any change to inputs produces a different key
/// - Keys are fixed-length (32 hex chars) for consistent storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    /// `chain` identifies the providers that may have produced the value,
    /// so switching from the statistical fallback to an LLM does not serve
    /// the older, lower-quality translation.
    pub fn new(chain: &str, source_lang: &Lang, target_lang: &Lang, text: &str) -> Self {
        // Null-byte separators keep ("a", "bc") and ("ab", "c") apart
        let combined = format!(
            "{}\0{}\0{}\0{}",
            chain.to_lowercase(),
            source_lang.as_str(),
            target_lang.as_str(),
            text,
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(chain: &str, src: &str, tgt: &str, text: &str) -> CacheKey {
        CacheKey::new(chain, &Lang::new(src), &Lang::new(tgt), text)
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key("gemini>google", "auto", "de", "Hello world");
        assert_eq!(k.to_string().len(), 32);
        assert!(k.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_differs_by_every_input() {
        let base = key("gemini", "fr", "en", "Bonjour");
        assert_ne!(base, key("google", "fr", "en", "Bonjour"));
        assert_ne!(base, key("gemini", "auto", "en", "Bonjour"));
        assert_ne!(base, key("gemini", "fr", "de", "Bonjour"));
        assert_ne!(base, key("gemini", "fr", "en", "Bonsoir"));
    }

    #[test]
    fn test_cache_key_separators_prevent_collisions() {
        assert_ne!(key("a", "b", "c", "d"), key("a\0b", "", "c", "d"));
    }

    #[test]
    fn test_cache_key_case_insensitive_chain() {
        assert_eq!(key("Gemini", "fr", "en", "x"), key("GEMINI", "fr", "en", "x"));
    }
}
