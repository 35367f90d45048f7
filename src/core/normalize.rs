// File: src/core/normalize.rs
use crate::config::SpellConfig;
use ahash::AHashSet;
use unicode_normalization::UnicodeNormalization;

/// Turns raw tokens into dictionary keys.
///
/// The same normalizer must be used for building indexes and for querying them,
/// otherwise exact matches stop being found at distance 0.
#[derive(Debug, Clone)]
pub struct Normalizer {
    excluded: AHashSet<char>,
    lowercase: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&SpellConfig::default())
    }
}

impl Normalizer {
    pub fn new(excluded_chars: &str, lowercase: bool) -> Self {
        Self {
            excluded: excluded_chars.chars().collect(),
            lowercase,
        }
    }

    pub fn from_config(config: &SpellConfig) -> Self {
        Self::new(&config.excluded_chars, config.lowercase)
    }

    /// Normalizes a single token. Returns `None` if nothing is left.
    ///
    /// NFC composition first, so precomposed and decomposed spellings share a key.
    /// Combining marks such as Indic vowel signs are word characters and survive.
    pub fn normalize_word(&self, raw: &str) -> Option<String> {
        let mut word = String::with_capacity(raw.len());
        for c in raw.nfc() {
            if c.is_whitespace() || c.is_control() || self.excluded.contains(&c) {
                continue;
            }
            if self.lowercase {
                word.extend(c.to_lowercase());
            } else {
                word.push(c);
            }
        }
        if word.is_empty() {
            None
        } else {
            Some(word)
        }
    }

    /// Normalizes a token batch, dropping tokens that normalize to nothing.
    /// Order and duplicates are preserved.
    pub fn normalize<S: AsRef<str>>(&self, raw_tokens: &[S]) -> Vec<String> {
        raw_tokens
            .iter()
            .filter_map(|token| self.normalize_word(token.as_ref()))
            .collect()
    }

    pub fn is_excluded(&self, c: char) -> bool {
        self.excluded.contains(&c)
    }
}

/// Splits free text into raw tokens on whitespace.
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation_and_digits() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize_word("Hello,"), Some("hello".to_string()));
        assert_eq!(normalizer.normalize_word("\u{201C}quoted\u{201D}"), Some("quoted".to_string()));
        assert_eq!(normalizer.normalize_word("abc123"), Some("abc".to_string()));
        assert_eq!(normalizer.normalize_word("  trim  "), Some("trim".to_string()));
    }

    #[test]
    fn test_empty_results_are_dropped() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.normalize_word("...!?"), None);
        assert_eq!(normalizer.normalize_word("   "), None);
        assert_eq!(normalizer.normalize_word("\u{0CE7}\u{0CE8}"), None);

        let words = normalizer.normalize(&["a", "--", "b", "", "a"]);
        assert_eq!(words, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_preserves_kannada_letters_and_vowel_signs() {
        let normalizer = Normalizer::default();
        // ಕನ್ನಡ: consonants, virama and a vowel-less final letter.
        let word = "\u{0C95}\u{0CA8}\u{0CCD}\u{0CA8}\u{0CA1}";
        assert_eq!(normalizer.normalize_word(word), Some(word.to_string()));

        // ಕಿ with a trailing danda-like punctuation mark.
        let with_punct = "\u{0C95}\u{0CBF}.";
        assert_eq!(normalizer.normalize_word(with_punct), Some("\u{0C95}\u{0CBF}".to_string()));
    }

    #[test]
    fn test_nfc_composes_decomposed_input() {
        let normalizer = Normalizer::default();
        let decomposed = "cafe\u{0301}";
        assert_eq!(normalizer.normalize_word(decomposed), Some("caf\u{00E9}".to_string()));
    }

    #[test]
    fn test_custom_exclusion_without_lowercase() {
        let normalizer = Normalizer::new("x", false);
        assert_eq!(normalizer.normalize_word("XaxB!"), Some("XaB!".to_string()));
        assert!(normalizer.is_excluded('x'));
        assert!(!normalizer.is_excluded('!'));
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words(" one\ttwo\nthree  "), vec!["one", "two", "three"]);
        assert!(split_words("").is_empty());
    }
}
