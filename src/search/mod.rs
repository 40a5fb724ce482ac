//! Record discovery: normalization, fuzzy matching, filtering, sorting and
//! query suggestions over poll listings

pub mod distance;
pub mod filter;
pub mod fuzzy;
pub mod normalize;
pub mod sort;
pub mod suggest;

pub use distance::edit_distance;
pub use filter::{FilterInput, FilterPipeline, FilterState, ResolvedFilter};
pub use fuzzy::{field_matches, token_matches, FuzzyMatcher, Highlight};
pub use normalize::{normalize, tokenize};
pub use sort::{SortConfig, SortContext, SortDirection, SortKey};
pub use suggest::{suggest, SourceType, Suggestion, SuggestionEngine};

use crate::records::{Poll, PollStatus};
use std::collections::HashMap;
use tracing::debug;

/// Filter `records` by `filter`, then order them by `sort` relative to the current time
pub fn filter_and_sort(records: &[Poll], filter: &FilterState, sort: &SortConfig) -> Vec<Poll> {
    filter_and_sort_at(records, filter, sort, &SortContext::now())
}

/// [`filter_and_sort`] with an explicit reference time for the derived scores
pub fn filter_and_sort_at(
    records: &[Poll],
    filter: &FilterState,
    sort: &SortConfig,
    ctx: &SortContext,
) -> Vec<Poll> {
    let pipeline = FilterPipeline::new(filter);
    let mut kept: Vec<&Poll> = records.iter().filter(|p| pipeline.matches(p)).collect();
    debug!(
        "Filter kept {} of {} polls; sorting by {} ({:?}, secondary {:?})",
        kept.len(),
        records.len(),
        sort.primary_key,
        sort.direction,
        sort.secondary_key
    );
    sort::sort_polls(&mut kept, sort, ctx);
    kept.into_iter().cloned().collect()
}

/// Distinct values in first-seen order, narrowed by a case- and accent-insensitive substring
fn distinct<'a>(values: impl Iterator<Item = &'a str>, search: Option<&str>) -> Vec<String> {
    let needle = search.map(normalize).filter(|n| !n.trim().is_empty());
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for value in values.filter(|v| !v.trim().is_empty()) {
        let key = normalize(value);
        if seen.contains(&key) {
            continue;
        }
        if let Some(needle) = &needle {
            if !key.contains(needle.trim()) {
                continue;
            }
        }
        seen.push(key);
        out.push(value.to_string());
    }
    out
}

/// Categories present in `records`, for the category picker
pub fn categories(records: &[Poll], search: Option<&str>) -> Vec<String> {
    distinct(records.iter().map(|p| p.category.as_str()), search)
}

/// Creators present in `records`, for the creator picker
pub fn creators(records: &[Poll], search: Option<&str>) -> Vec<String> {
    distinct(records.iter().filter_map(|p| p.creator.as_deref()), search)
}

/// Number of polls per status, every status listed
pub fn status_counts(records: &[Poll]) -> Vec<(PollStatus, usize)> {
    PollStatus::ALL
        .iter()
        .map(|status| (*status, records.iter().filter(|p| p.status == *status).count()))
        .collect()
}

/// Number of polls per category, in first-seen order
pub fn category_counts(records: &[Poll]) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for poll in records.iter().filter(|p| !p.category.trim().is_empty()) {
        match index.get(&normalize(&poll.category)) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(normalize(&poll.category), counts.len());
                counts.push((poll.category.clone(), 1));
            }
        }
    }
    counts
}
