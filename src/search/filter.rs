//! Filter pipeline
//!
//! A record passes when every predicate holds: search, category, status,
//! date range, participants range and creator. An empty constraint never
//! filters anything out.

use super::fuzzy::FuzzyMatcher;
use super::normalize::{normalize, tokenize};
use crate::error::{AppError, ValidationMessage};
use crate::records::{parse_timestamp, Poll, PollStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Single-status tab used when no explicit status set is selected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTab {
    #[default]
    All,
    Only(PollStatus),
}

impl StatusTab {
    /// `All` (any case) is the wildcard, anything else must be a status name
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.trim().eq_ignore_ascii_case("all") {
            Ok(StatusTab::All)
        } else {
            raw.parse().map(StatusTab::Only)
        }
    }
}

/// Open-ended interval; either bound may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantsRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl ParticipantsRange {
    pub fn is_inverted(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min > max)
    }
}

/// Current filter selections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub search_query: String,
    pub categories: Vec<String>,
    pub statuses: Vec<PollStatus>,
    pub active_tab: StatusTab,
    pub date_range: DateRange,
    pub participants_range: ParticipantsRange,
    pub creators: Vec<String>,
}

impl FilterState {
    /// Report inverted ranges. They are never swapped; the caller decides.
    pub fn validate(&self) -> Vec<ValidationMessage> {
        let mut messages = Vec::new();
        if self.date_range.is_inverted() {
            let err = AppError::InvalidRange(format!(
                "start {:?} is after end {:?}",
                self.date_range.start, self.date_range.end
            ));
            messages.push(ValidationMessage::new("dateRange", &err));
        }
        if self.participants_range.is_inverted() {
            let err = AppError::InvalidRange(format!(
                "min {:?} is greater than max {:?}",
                self.participants_range.min, self.participants_range.max
            ));
            messages.push(ValidationMessage::new("participantsRange", &err));
        }
        messages
    }
}

pub fn matches_search(poll: &Poll, tokens: &[String], matcher: &FuzzyMatcher) -> bool {
    matcher.field_matches(&poll.searchable_text(), tokens)
}

/// `normalized_categories` must already be normalized
pub fn matches_category(poll: &Poll, normalized_categories: &[String]) -> bool {
    if normalized_categories.is_empty() {
        return true;
    }
    let category = normalize(&poll.category);
    normalized_categories.iter().any(|c| category.contains(c.as_str()))
}

pub fn matches_status(poll: &Poll, statuses: &[PollStatus], tab: StatusTab) -> bool {
    if !statuses.is_empty() {
        return statuses.contains(&poll.status);
    }
    match tab {
        StatusTab::All => true,
        StatusTab::Only(status) => poll.status == status,
    }
}

/// The poll occupies `[start_date, end_date]`; it passes when it overlaps the range
pub fn matches_date_range(poll: &Poll, range: &DateRange) -> bool {
    let after_start = range.start.map_or(true, |start| poll.end_date >= start);
    let before_end = range.end.map_or(true, |end| poll.start_date <= end);
    after_start && before_end
}

pub fn matches_participants(poll: &Poll, range: &ParticipantsRange) -> bool {
    range.min.map_or(true, |min| min <= poll.participant_count)
        && range.max.map_or(true, |max| poll.participant_count <= max)
}

pub fn matches_creator(poll: &Poll, creators: &[String]) -> bool {
    if creators.is_empty() {
        return true;
    }
    poll.creator
        .as_ref()
        .is_some_and(|creator| creators.iter().any(|c| c == creator))
}

/// A filter state compiled for repeated evaluation
pub struct FilterPipeline<'a> {
    state: &'a FilterState,
    tokens: Vec<String>,
    categories: Vec<String>,
    matcher: FuzzyMatcher,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(state: &'a FilterState) -> Self {
        Self::with_matcher(state, FuzzyMatcher::new())
    }

    pub fn with_matcher(state: &'a FilterState, matcher: FuzzyMatcher) -> Self {
        let tokens = tokenize(&state.search_query);
        let categories = state.categories.iter().map(|c| normalize(c)).collect();
        debug!("Filter pipeline compiled with {} search tokens", tokens.len());
        Self {
            state,
            tokens,
            categories,
            matcher,
        }
    }

    /// Logical AND of all predicates, cheapest first
    pub fn matches(&self, poll: &Poll) -> bool {
        matches_status(poll, &self.state.statuses, self.state.active_tab)
            && matches_participants(poll, &self.state.participants_range)
            && matches_date_range(poll, &self.state.date_range)
            && matches_creator(poll, &self.state.creators)
            && matches_category(poll, &self.categories)
            && matches_search(poll, &self.tokens, &self.matcher)
    }
}

/// Does `poll` pass every constraint of `state`?
pub fn matches(poll: &Poll, state: &FilterState) -> bool {
    FilterPipeline::new(state).matches(poll)
}

/// Raw, user-typed filter selections, before any parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterInput {
    pub search_query: String,
    pub categories: Vec<String>,
    pub statuses: Vec<String>,
    pub active_tab: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub participants_min: Option<String>,
    pub participants_max: Option<String>,
    pub creators: Vec<String>,
}

/// Result of resolving raw input: the usable state plus what was ignored or flagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub state: FilterState,
    pub messages: Vec<ValidationMessage>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl FilterInput {
    /// Parse raw strings. Malformed values drop their constraint and add a
    /// message; inverted ranges are kept as supplied and flagged.
    pub fn resolve(&self) -> ResolvedFilter {
        let mut messages = Vec::new();

        let mut parse_date = |field: &str, raw: &Option<String>| {
            present(raw).and_then(|raw| match parse_timestamp(raw) {
                Ok(date) => Some(date),
                Err(err) => {
                    debug!("Ignoring {} bound: {}", field, err);
                    messages.push(ValidationMessage::new(field, &err));
                    None
                }
            })
        };
        let date_range = DateRange {
            start: parse_date("dateRange.start", &self.date_start),
            end: parse_date("dateRange.end", &self.date_end),
        };

        let mut parse_count = |field: &str, raw: &Option<String>| {
            present(raw).and_then(|raw| match raw.parse::<u64>() {
                Ok(n) => Some(n),
                Err(e) => {
                    let err = AppError::InvalidInput(format!("{}: {}", raw, e));
                    debug!("Ignoring {} bound: {}", field, err);
                    messages.push(ValidationMessage::new(field, &err));
                    None
                }
            })
        };
        let participants_range = ParticipantsRange {
            min: parse_count("participantsRange.min", &self.participants_min),
            max: parse_count("participantsRange.max", &self.participants_max),
        };

        let mut statuses = Vec::new();
        for raw in &self.statuses {
            match raw.parse::<PollStatus>() {
                Ok(status) if !statuses.contains(&status) => statuses.push(status),
                Ok(_) => {}
                Err(err) => messages.push(ValidationMessage::new("statuses", &err)),
            }
        }

        let active_tab = match present(&self.active_tab).map(StatusTab::parse) {
            None => StatusTab::All,
            Some(Ok(tab)) => tab,
            Some(Err(err)) => {
                messages.push(ValidationMessage::new("activeTab", &err));
                StatusTab::All
            }
        };

        let state = FilterState {
            search_query: self.search_query.clone(),
            categories: self.categories.clone(),
            statuses,
            active_tab,
            date_range,
            participants_range,
            creators: self.creators.clone(),
        };
        messages.extend(state.validate());

        ResolvedFilter { state, messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::fixtures::{date, poll, sample_polls};

    fn apply(state: &FilterState, polls: &[Poll]) -> Vec<String> {
        let pipeline = FilterPipeline::new(state);
        polls
            .iter()
            .filter(|p| pipeline.matches(p))
            .map(|p| p.id.clone())
            .collect()
    }

    #[test]
    fn test_empty_state_matches_everything() {
        let polls = sample_polls();
        assert_eq!(apply(&FilterState::default(), &polls).len(), polls.len());
    }

    #[test]
    fn test_status_set_membership() {
        let polls = vec![
            poll("a", "One", "Tech", PollStatus::Active),
            poll("b", "Two", "Env", PollStatus::Upcoming),
        ];
        let state = FilterState {
            statuses: vec![PollStatus::Active],
            ..Default::default()
        };
        assert_eq!(apply(&state, &polls), vec!["a"]);
    }

    #[test]
    fn test_status_set_overrides_tab() {
        let polls = sample_polls();
        let state = FilterState {
            statuses: vec![PollStatus::Completed],
            active_tab: StatusTab::Only(PollStatus::Active),
            ..Default::default()
        };
        assert_eq!(apply(&state, &polls), vec!["poll-3"]);

        let tab_only = FilterState {
            active_tab: StatusTab::Only(PollStatus::Active),
            ..Default::default()
        };
        assert_eq!(apply(&tab_only, &polls), vec!["poll-1", "poll-4"]);
    }

    #[test]
    fn test_search_spans_fields() {
        let polls = sample_polls();
        let by_description = FilterState {
            search_query: "hybrid".to_string(),
            ..Default::default()
        };
        assert_eq!(apply(&by_description, &polls), vec!["poll-4"]);

        let by_creator = FilterState {
            search_query: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(apply(&by_creator, &polls), vec!["poll-1"]);

        let typo = FilterState {
            search_query: "wprk".to_string(),
            ..Default::default()
        };
        // four characters: no typo tolerance
        assert!(apply(&typo, &polls).is_empty());
    }

    #[test]
    fn test_category_partial_normalized() {
        let polls = sample_polls();
        let state = FilterState {
            categories: vec!["TECH".to_string(), "life".to_string()],
            ..Default::default()
        };
        assert_eq!(apply(&state, &polls), vec!["poll-1", "poll-5"]);
    }

    #[test]
    fn test_date_range_overlap() {
        let p = {
            let mut p = poll("a", "t", "c", PollStatus::Active);
            p.start_date = date("2024-03-01");
            p.end_date = date("2024-03-15");
            p
        };
        let from = DateRange {
            start: Some(date("2024-03-10")),
            end: None,
        };
        assert!(matches_date_range(&p, &from));

        let until = DateRange {
            start: None,
            end: Some(date("2024-02-28")),
        };
        assert!(!matches_date_range(&p, &until));

        let inside = DateRange {
            start: Some(date("2024-03-05")),
            end: Some(date("2024-03-06")),
        };
        assert!(matches_date_range(&p, &inside));

        let after = DateRange {
            start: Some(date("2024-03-16")),
            end: Some(date("2024-03-20")),
        };
        assert!(!matches_date_range(&p, &after));
        assert!(matches_date_range(&p, &DateRange::default()));
    }

    #[test]
    fn test_participants_range() {
        let polls = sample_polls();
        let state = FilterState {
            participants_range: ParticipantsRange {
                min: Some(500),
                max: Some(1250),
            },
            ..Default::default()
        };
        assert_eq!(apply(&state, &polls), vec!["poll-1", "poll-4"]);
    }

    #[test]
    fn test_creator_membership() {
        let polls = sample_polls();
        let state = FilterState {
            creators: vec!["bob".to_string()],
            ..Default::default()
        };
        assert_eq!(apply(&state, &polls), vec!["poll-4"]);

        let nobody = FilterState {
            creators: vec!["Bob".to_string()],
            ..Default::default()
        };
        assert!(apply(&nobody, &polls).is_empty());
    }

    #[test]
    fn test_matches_free_function_agrees_with_pipeline() {
        let polls = sample_polls();
        let state = FilterState {
            search_query: "share".to_string(),
            statuses: vec![PollStatus::Upcoming, PollStatus::Completed],
            ..Default::default()
        };
        let expected = apply(&state, &polls);
        let actual: Vec<String> = polls
            .iter()
            .filter(|p| matches(p, &state))
            .map(|p| p.id.clone())
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(actual, vec!["poll-3", "poll-5"]);
    }

    #[test]
    fn test_resolve_drops_malformed_dates() {
        let input = FilterInput {
            date_start: Some("not a date".to_string()),
            date_end: Some("2024-03-20".to_string()),
            ..Default::default()
        };
        let resolved = input.resolve();
        assert_eq!(resolved.state.date_range.start, None);
        assert_eq!(resolved.state.date_range.end, Some(date("2024-03-20")));
        assert_eq!(resolved.messages.len(), 1);
        assert_eq!(resolved.messages[0].field, "dateRange.start");
        assert_eq!(resolved.messages[0].code, "invalid_date");
    }

    #[test]
    fn test_resolve_flags_inverted_range_without_swapping() {
        let input = FilterInput {
            participants_min: Some("100".to_string()),
            participants_max: Some("10".to_string()),
            ..Default::default()
        };
        let resolved = input.resolve();
        assert_eq!(resolved.state.participants_range.min, Some(100));
        assert_eq!(resolved.state.participants_range.max, Some(10));
        assert_eq!(resolved.messages.len(), 1);
        assert_eq!(resolved.messages[0].code, "invalid_range");
    }

    #[test]
    fn test_resolve_statuses_and_tab() {
        let input = FilterInput {
            statuses: vec!["active".to_string(), "Active".to_string(), "archived".to_string()],
            active_tab: Some("All".to_string()),
            participants_min: Some("  ".to_string()),
            ..Default::default()
        };
        let resolved = input.resolve();
        assert_eq!(resolved.state.statuses, vec![PollStatus::Active]);
        assert_eq!(resolved.state.active_tab, StatusTab::All);
        assert_eq!(resolved.state.participants_range.min, None);
        assert_eq!(resolved.messages.len(), 1);
        assert_eq!(resolved.messages[0].field, "statuses");
    }
}
