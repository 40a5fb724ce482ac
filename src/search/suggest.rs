//! Query suggestions
//!
//! Candidates come from record titles, categories and description keywords,
//! a fixed vocabulary of common terms, the search history and the most
//! recently added records. Each source scores substring hits higher than
//! near-misses. Query tokens are first widened through a synonym table.

use super::distance::edit_distance;
use super::fuzzy::{find_highlight, Highlight};
use super::normalize::{collate, normalize, tokenize};
use crate::history::HistoryStore;
use crate::records::Poll;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Abbreviation followed by its synonyms
const SYNONYMS: &[(&str, &[&str])] = &[
    ("tech", &["technology", "it", "computing"]),
    ("env", &["environment", "eco", "climate"]),
    ("ent", &["entertainment", "movies", "music"]),
    ("work", &["career", "job", "employment"]),
    ("life", &["lifestyle", "living", "wellness"]),
    ("vote", &["voting", "poll", "ballot"]),
    ("soon", &["upcoming", "future"]),
    ("old", &["completed", "ended", "closed"]),
    ("now", &["active", "open", "live"]),
];

const COMMON_TERMS: &[&str] = &[
    "active",
    "upcoming",
    "completed",
    "technology",
    "environment",
    "entertainment",
    "work",
    "lifestyle",
    "voting",
    "results",
    "open",
    "closed",
    "trending",
    "new",
    "ending soon",
    "popular",
];

/// Where a suggestion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    Title,
    Category,
    Keyword,
    CommonTerm,
    History,
    Recent,
}

impl SourceType {
    /// Lower ranks first on equal score
    fn tie_rank(self) -> u8 {
        match self {
            SourceType::Recent => 0,
            SourceType::Title => 1,
            _ => 2,
        }
    }
}

/// A scored completion for a partially typed query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub value: String,
    pub source_type: SourceType,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// First literal, case-insensitive occurrence of the query in `value`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

/// Points awarded per expanded token by one candidate source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWeights {
    /// Token is a substring of the candidate
    pub contains: u32,
    /// Token is within `max_distance` edits of the candidate
    pub near: u32,
    pub max_distance: usize,
    /// Added once when the candidate scored at all
    pub bonus: u32,
}

impl SourceWeights {
    const fn new(contains: u32, near: u32, max_distance: usize, bonus: u32) -> Self {
        Self {
            contains,
            near,
            max_distance,
            bonus,
        }
    }

    /// Sum over tokens; `None` when no token hit
    fn score(&self, candidate: &str, tokens: &[String]) -> Option<u32> {
        let total: u32 = tokens
            .iter()
            .map(|token| {
                if candidate.contains(token.as_str()) {
                    return self.contains;
                }
                // distance 0 is already covered by containment
                if edit_distance(candidate, token) <= self.max_distance {
                    self.near
                } else {
                    0
                }
            })
            .sum();
        (total > 0).then_some(total + self.bonus)
    }
}

/// Scoring table, one entry per source
#[derive(Debug, Clone)]
pub struct SuggestionWeights {
    pub title: SourceWeights,
    pub category: SourceWeights,
    pub keyword: SourceWeights,
    pub common_term: SourceWeights,
    pub history: SourceWeights,
    /// Flat score for a recent record whose title contains a token
    pub recent: u32,
    /// Shortest description word considered a keyword
    pub min_keyword_len: usize,
}

impl Default for SuggestionWeights {
    fn default() -> Self {
        Self {
            title: SourceWeights::new(10, 7, 2, 5),
            category: SourceWeights::new(8, 5, 2, 2),
            keyword: SourceWeights::new(4, 2, 1, 0),
            common_term: SourceWeights::new(6, 3, 1, 0),
            history: SourceWeights::new(9, 4, 1, 0),
            recent: 7,
            min_keyword_len: 3,
        }
    }
}

/// Expand each token through the synonym table.
///
/// A token pulls in its whole group when it equals an entry, or when both it
/// and the entry are at least four characters long and one edit apart.
pub fn expand_tokens(tokens: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    let mut add = |word: &str| {
        if !expanded.iter().any(|w| w == word) {
            expanded.push(word.to_string());
        }
    };

    for token in tokens {
        add(token.as_str());
        let token_len = token.chars().count();
        for (abbr, synonyms) in SYNONYMS {
            let group = std::iter::once(abbr).chain(synonyms.iter());
            let hit = group.clone().any(|entry| {
                *entry == token.as_str()
                    || (token_len >= 4
                        && entry.chars().count() >= 4
                        && edit_distance(entry, token) <= 1)
            });
            if hit {
                group.for_each(|entry| add(*entry));
            }
        }
    }
    expanded
}

/// Suggestion generator
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    weights: SuggestionWeights,
    recent_window: usize,
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self {
            weights: SuggestionWeights::default(),
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }

    pub fn with_recent_window(mut self, recent_window: usize) -> Self {
        self.recent_window = recent_window;
        self
    }

    pub fn with_weights(mut self, weights: SuggestionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Ranked, deduplicated completions for `query`.
    ///
    /// When the best suggestion is the query itself, the query is recorded in
    /// `history`. A failing history write is logged, not returned.
    pub fn suggest(
        &self,
        query: &str,
        records: &[Poll],
        history: &mut dyn HistoryStore,
        limit: usize,
    ) -> Vec<Suggestion> {
        let normalized_query = normalize(query);
        let normalized_query = normalized_query.trim();
        if normalized_query.is_empty() {
            return Vec::new();
        }

        let tokens = expand_tokens(&tokenize(normalized_query));
        let mut candidates = self.record_candidates(records, &tokens);
        candidates.extend(self.common_term_candidates(&tokens));
        candidates.extend(self.history_candidates(&history.read(), &tokens));
        candidates.extend(self.recent_candidates(records, &tokens));
        let generated = candidates.len();

        let mut suggestions = dedup_by_value(candidates);
        suggestions.sort_by(rank);
        suggestions.truncate(limit);
        debug!(
            "Suggestions for '{}': {} candidates, {} kept",
            query,
            generated,
            suggestions.len()
        );

        if let Some(top) = suggestions.first() {
            if normalize(&top.value).trim() == normalized_query {
                debug!("Recording '{}' in search history", query);
                if let Err(e) = history.push(query) {
                    warn!("Failed to record search history: {}", e);
                }
            }
        }

        for suggestion in &mut suggestions {
            suggestion.highlight = find_highlight(&suggestion.value, query);
        }
        suggestions
    }

    fn record_candidates(&self, records: &[Poll], tokens: &[String]) -> Vec<Suggestion> {
        let w = &self.weights;
        let mut out = Vec::new();
        for poll in records {
            let id = Some(poll.id.clone());
            if let Some(score) = w.title.score(&normalize(&poll.title), tokens) {
                out.push(candidate(&poll.title, SourceType::Title, score, id.clone()));
            }
            if let Some(score) = w.category.score(&normalize(&poll.category), tokens) {
                out.push(candidate(&poll.category, SourceType::Category, score, id.clone()));
            }

            let description = normalize(&poll.description);
            let mut seen: Vec<&str> = Vec::new();
            for word in description.unicode_words() {
                if word.chars().count() < w.min_keyword_len || seen.contains(&word) {
                    continue;
                }
                seen.push(word);
                if let Some(score) = w.keyword.score(word, tokens) {
                    out.push(candidate(word, SourceType::Keyword, score, id.clone()));
                }
            }
        }
        out
    }

    fn common_term_candidates(&self, tokens: &[String]) -> Vec<Suggestion> {
        COMMON_TERMS
            .iter()
            .filter_map(|term| {
                self.weights
                    .common_term
                    .score(term, tokens)
                    .map(|score| candidate(term, SourceType::CommonTerm, score, None))
            })
            .collect()
    }

    fn history_candidates(&self, entries: &[String], tokens: &[String]) -> Vec<Suggestion> {
        entries
            .iter()
            .filter_map(|entry| {
                self.weights
                    .history
                    .score(&normalize(entry), tokens)
                    .map(|score| candidate(entry, SourceType::History, score, None))
            })
            .collect()
    }

    /// The last `recent_window` records are taken as the most recently added
    fn recent_candidates(&self, records: &[Poll], tokens: &[String]) -> Vec<Suggestion> {
        let skip = records.len().saturating_sub(self.recent_window);
        records[skip..]
            .iter()
            .filter(|poll| {
                let title = normalize(&poll.title);
                tokens.iter().any(|t| title.contains(t.as_str()))
            })
            .map(|poll| {
                candidate(
                    &poll.title,
                    SourceType::Recent,
                    self.weights.recent,
                    Some(poll.id.clone()),
                )
            })
            .collect()
    }
}

fn candidate(value: &str, source_type: SourceType, score: u32, record_id: Option<String>) -> Suggestion {
    Suggestion {
        value: value.to_string(),
        source_type,
        score,
        record_id,
        highlight: None,
    }
}

/// Keep the best-scored candidate per lowercased value; the first one wins a tie.
/// Accents are kept, so "Café" and "Cafe" stay separate suggestions.
fn dedup_by_value(candidates: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Suggestion> = Vec::new();
    for c in candidates {
        let key = c.value.to_lowercase();
        match index.get(&key) {
            Some(&i) if kept[i].score < c.score => kept[i] = c,
            Some(_) => {}
            None => {
                index.insert(key, kept.len());
                kept.push(c);
            }
        }
    }
    kept
}

/// Score descending, then recent, then title, then value
fn rank(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.source_type.tie_rank().cmp(&b.source_type.tie_rank()))
        .then_with(|| collate(&a.value, &b.value))
}

/// Convenience wrapper over [`SuggestionEngine::suggest`] with default settings
pub fn suggest(
    query: &str,
    records: &[Poll],
    history: &mut dyn HistoryStore,
    limit: Option<usize>,
) -> Vec<Suggestion> {
    SuggestionEngine::new().suggest(
        query,
        records,
        history,
        limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use crate::records::fixtures::{poll, sample_polls};
    use crate::records::PollStatus;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_empty_query() {
        let mut history = MemoryHistory::default();
        assert!(suggest("", &sample_polls(), &mut history, None).is_empty());
        assert!(suggest("   ", &sample_polls(), &mut history, None).is_empty());
    }

    #[test]
    fn test_expand_tokens() {
        assert_eq!(
            expand_tokens(&strings(&["tech"])),
            strings(&["tech", "technology", "it", "computing"])
        );
        // synonym side pulls in the abbreviation too
        assert_eq!(
            expand_tokens(&strings(&["climate"])),
            strings(&["climate", "env", "environment", "eco"])
        );
        // typo of a four-letter entry
        assert!(expand_tokens(&strings(&["tecg"])).contains(&"technology".to_string()));
        // short tokens only expand on exact hits
        assert_eq!(expand_tokens(&strings(&["at"])), strings(&["at"]));
        // dedup across tokens
        assert_eq!(expand_tokens(&strings(&["tech", "it"])).len(), 4);
    }

    #[test]
    fn test_typo_surfaces_category_through_synonyms() {
        let mut history = MemoryHistory::default();
        let results = suggest("tecg", &sample_polls(), &mut history, None);
        let top = &results[0];
        assert_eq!(top.value, "Technology");
        assert_eq!(top.source_type, SourceType::Category);
        assert_eq!(top.score, 18);
        assert_eq!(top.record_id.as_deref(), Some("poll-1"));
        assert_eq!(top.highlight, None);
        assert!(history.read().is_empty());
    }

    #[test]
    fn test_dedup_keeps_highest_score() {
        let candidates = vec![
            candidate("technology", SourceType::CommonTerm, 12, None),
            candidate("Technology", SourceType::Category, 18, Some("p".to_string())),
            candidate("TECHNOLOGY", SourceType::History, 18, None),
        ];
        let kept = dedup_by_value(candidates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 18);
        assert_eq!(kept[0].source_type, SourceType::Category);
    }

    #[test]
    fn test_dedup_keeps_accented_values_apart() {
        let candidates = vec![
            candidate("Café", SourceType::Title, 12, None),
            candidate("cafe", SourceType::History, 9, None),
            candidate("CAFÉ", SourceType::Category, 7, None),
        ];
        let kept = dedup_by_value(candidates);
        let values: Vec<&str> = kept.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["Café", "cafe"]);
    }

    #[test]
    fn test_near_misses_score_per_source() {
        let mut art = poll("p1", "Art", "Art", PollStatus::Active);
        art.description = "the ark sails".to_string();
        let mut history = MemoryHistory::from_entries(["arc"], 10);
        let results = suggest("arx", &[art], &mut history, None);

        let scored: Vec<(&str, SourceType, u32)> = results
            .iter()
            .map(|s| (s.value.as_str(), s.source_type, s.score))
            .collect();
        // the category "Art" (5 + 2) collapses into the title "Art" (7 + 5)
        assert_eq!(
            scored,
            vec![
                ("Art", SourceType::Title, 12),
                ("arc", SourceType::History, 4),
                ("ark", SourceType::Keyword, 2),
            ]
        );
        assert_eq!(history.read(), vec!["arc"]);
    }

    #[test]
    fn test_common_term_near_miss() {
        let mut history = MemoryHistory::default();
        let results = suggest("popuar", &[], &mut history, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "popular");
        assert_eq!(results[0].source_type, SourceType::CommonTerm);
        assert_eq!(results[0].score, 3);

        let weights = SuggestionWeights::default();
        assert_eq!(weights.common_term.score("active", &["actve".to_string()]), Some(3));
        assert_eq!(weights.common_term.score("active", &["acve".to_string()]), None);
    }

    #[test]
    fn test_tie_break_order() {
        let mut ranked = vec![
            candidate("zeta", SourceType::Keyword, 7, None),
            candidate("alpha", SourceType::History, 7, None),
            candidate("gamma", SourceType::Title, 7, None),
            candidate("omega", SourceType::Recent, 7, None),
            candidate("beta", SourceType::Keyword, 9, None),
        ];
        ranked.sort_by(rank);
        let values: Vec<&str> = ranked.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["beta", "omega", "gamma", "alpha", "zeta"]);
    }

    #[test]
    fn test_title_beats_recent_duplicate() {
        let mut history = MemoryHistory::default();
        let results = suggest("climate", &sample_polls(), &mut history, None);
        let title = results
            .iter()
            .find(|s| s.value == "Climate Change Solutions")
            .unwrap();
        assert_eq!(title.source_type, SourceType::Title);
        assert_eq!(title.score, 15);
        assert_eq!(title.highlight, Some(Highlight { start: 0, len: 7 }));

        // Environment category: "env" and "environment" both contained
        assert_eq!(results[0].value, "Environment");
        assert_eq!(results[0].score, 18);
    }

    #[test]
    fn test_recent_window_only_covers_tail() {
        let mut polls: Vec<Poll> = (0..3)
            .map(|i| poll(&format!("p{}", i), &format!("Zebra {}", i), "", PollStatus::Active))
            .collect();
        polls[0].title = "Quiz Night".to_string();
        polls[2].title = "Quiz Finals".to_string();

        let engine = SuggestionEngine::new()
            .with_recent_window(1)
            .with_weights(SuggestionWeights {
                title: SourceWeights::new(0, 0, 0, 0),
                ..SuggestionWeights::default()
            });
        let mut history = MemoryHistory::default();
        let results = engine.suggest("quiz", &polls, &mut history, 10);
        let recent: Vec<&str> = results
            .iter()
            .filter(|s| s.source_type == SourceType::Recent)
            .map(|s| s.value.as_str())
            .collect();
        assert_eq!(recent, vec!["Quiz Finals"]);
    }

    #[test]
    fn test_history_entries_are_candidates() {
        let mut history = MemoryHistory::from_entries(["movie night", "tax reform"], 10);
        let results = suggest("night", &[], &mut history, None);
        assert_eq!(results[0].value, "movie night");
        assert_eq!(results[0].source_type, SourceType::History);
        assert_eq!(results[0].score, 9);
        assert!(!results.iter().any(|s| s.value == "tax reform"));
    }

    #[test]
    fn test_exact_top_suggestion_is_recorded() {
        let mut history = MemoryHistory::default();
        let results = suggest("Technology", &sample_polls(), &mut history, None);
        assert_eq!(results[0].value, "Technology");
        assert_eq!(history.read(), vec!["Technology"]);

        // the recorded query now also feeds back as a history candidate
        let again = suggest("technology", &sample_polls(), &mut history, None);
        assert_eq!(again[0].value, "Technology");
        assert_eq!(history.read(), vec!["technology"]);
    }

    #[test]
    fn test_limit_truncates() {
        let mut history = MemoryHistory::default();
        let all = suggest("e", &sample_polls(), &mut history, Some(50));
        assert!(all.len() > 3);
        let few = suggest("e", &sample_polls(), &mut history, Some(3));
        assert_eq!(few.len(), 3);
        assert_eq!(few[..], all[..3]);
    }

    #[test]
    fn test_keywords_from_description() {
        let mut history = MemoryHistory::default();
        let results = suggest("hybrid", &sample_polls(), &mut history, None);
        let keyword = results
            .iter()
            .find(|s| s.source_type == SourceType::Keyword)
            .unwrap();
        assert_eq!(keyword.value, "hybrid");
        assert_eq!(keyword.score, 4);
        assert_eq!(keyword.record_id.as_deref(), Some("poll-4"));
    }
}
