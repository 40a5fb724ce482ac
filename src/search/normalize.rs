//! Text canonicalization for comparison
//!
//! Lowercase, canonical decomposition (NFD), then combining diacritical marks
//! (U+0300..=U+036F) are dropped so that "Café" and "cafe" compare equal.

use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Canonicalize text for comparison. Whitespace is left untouched.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_diacritic(*c))
        .collect()
}

/// Normalize and split on runs of whitespace, dropping empty tokens
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Locale-aware-ish string ordering: accent and case insensitive first,
/// raw code point order as the tie-break so the result stays total.
pub fn collate(a: &str, b: &str) -> Ordering {
    normalize(a).cmp(&normalize(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Café"), "cafe");
        assert_eq!(normalize("RÉSUMÉ"), "resume");
        assert_eq!(normalize("naïve  Crème"), "naive  creme");
    }

    #[test]
    fn test_normalize_keeps_whitespace() {
        assert_eq!(normalize("  Tech  "), "  tech  ");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("  Best   Programming\tLanguage "), vec!["best", "programming", "language"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_collate() {
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("Éclair", "eclair"), Ordering::Greater);
        assert_eq!(collate("Éclair", "Ecole"), Ordering::Less);
        assert_eq!(collate("zeta", "Éclair"), Ordering::Greater);
        assert_eq!(collate("same", "same"), Ordering::Equal);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-zA-Z0-9À-ÿ \t]{0,32}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn tokens_have_no_whitespace(s in "[a-zA-ZÀ-ÿ \t]{0,32}") {
            for token in tokenize(&s) {
                prop_assert!(!token.is_empty());
                prop_assert!(!token.chars().any(char::is_whitespace));
            }
        }
    }
}
