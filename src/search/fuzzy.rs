//! Typo-tolerant token matching
//!
//! Short tokens (three characters or fewer by default) match a word when they
//! are a substring of it or one edit away from it. Longer tokens must appear
//! literally; they are assumed to be typed on purpose.

use super::distance::edit_distance;
use super::normalize::normalize;
use serde::Serialize;

/// Matching thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Tokens up to this many characters get the edit-distance fallback
    pub short_token_max_len: usize,
    /// Largest edit distance accepted for short tokens
    pub max_typos: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            short_token_max_len: 3,
            max_typos: 1,
        }
    }
}

/// Fuzzy matcher with configuration
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    config: MatcherConfig,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Does `token` match the single (already normalized) `word`?
    pub fn token_matches(&self, word: &str, token: &str) -> bool {
        if word.contains(token) {
            return true;
        }
        token.chars().count() <= self.config.short_token_max_len
            && edit_distance(word, token) <= self.config.max_typos
    }

    /// Every token must match some word of `text`. An empty token list matches anything.
    pub fn field_matches(&self, text: &str, tokens: &[String]) -> bool {
        if tokens.is_empty() {
            return true;
        }
        let normalized = normalize(text);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        tokens
            .iter()
            .all(|token| words.iter().any(|word| self.token_matches(word, token)))
    }
}

/// See [`FuzzyMatcher::token_matches`]
pub fn token_matches(word: &str, token: &str) -> bool {
    FuzzyMatcher::new().token_matches(word, token)
}

/// See [`FuzzyMatcher::field_matches`]
pub fn field_matches(text: &str, tokens: &[String]) -> bool {
    FuzzyMatcher::new().field_matches(text, tokens)
}

/// Byte span of a literal match inside a display string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub start: usize,
    pub len: usize,
}

impl Highlight {
    /// Wrap the highlighted span in `**` for markdown output
    pub fn apply(&self, text: &str) -> String {
        let end = self.start + self.len;
        match (text.get(..self.start), text.get(self.start..end), text.get(end..)) {
            (Some(before), Some(hit), Some(after)) => format!("{}**{}**{}", before, hit, after),
            _ => text.to_string(),
        }
    }
}

/// Find the first case-insensitive occurrence of `needle` inside `haystack`.
///
/// The returned span is in bytes of the original `haystack`, so it can be
/// used to slice it directly.
pub fn find_highlight(haystack: &str, needle: &str) -> Option<Highlight> {
    let needle: Vec<char> = needle.trim().chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }

    // Lowercased chars paired with the byte offset of the char they came from
    let folded: Vec<(usize, char)> = haystack
        .char_indices()
        .flat_map(|(idx, c)| c.to_lowercase().map(move |lc| (idx, lc)))
        .collect();

    if folded.len() < needle.len() {
        return None;
    }

    (0..=folded.len() - needle.len()).find_map(|i| {
        let window = &folded[i..i + needle.len()];
        if !window.iter().map(|(_, c)| *c).eq(needle.iter().copied()) {
            return None;
        }
        let start = window[0].0;
        let last = window[needle.len() - 1].0;
        let end = last + haystack[last..].chars().next().map_or(0, char::len_utf8);
        Some(Highlight {
            start,
            len: end - start,
        })
    })
}
