//! Symptom text normalisation.
//!
//! Turns raw symptom text into the word tokens the vectorizer's vocabulary was built from:
//! lowercase, `_` and `-` read as spaces, split on commas and whitespace, empty fragments
//! dropped, and optionally English function words removed.
//!
//! The stop-word policy is coupled to the trained vocabulary. A normalizer that filters stop
//! words feeding a vocabulary built without filtering (or the reverse) misaligns feature indices
//! without raising any error. [`crate::engine::EngineContextBuilder`] logs a warning when the
//! vectorizer records a different policy than the configuration, but nothing corrects it.

/// Closed set of English function words removed when filtering is enabled.
pub const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours", "he",
    "him", "his", "himself", "she", "her", "hers", "herself", "it", "its", "itself", "they",
    "them", "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "should", "now",
];

/// Returns true if `token` is in [`STOP_WORDS`].
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Symptom normaliser with a fixed stop-word policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Normalizer {
    filter_stopwords: bool,
}

impl Normalizer {
    pub fn new(filter_stopwords: bool) -> Self {
        Self { filter_stopwords }
    }

    pub fn filter_stopwords(&self) -> bool {
        self.filter_stopwords
    }

    /// Splits `raw` into normalised tokens.
    pub fn normalize(&self, raw: &str) -> Vec<String> {
        raw.to_lowercase()
            .replace(['_', '-'], " ")
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter(|token| !(self.filter_stopwords && is_stop_word(token)))
            .map(str::to_owned)
            .collect()
    }
}
