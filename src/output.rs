//! Markdown and JSON rendering for CLI results

use crate::error::ValidationMessage;
use crate::presets::FilterPreset;
use crate::records::{Poll, PollStatus};
use crate::search::suggest::Suggestion;
use crate::search::{SortConfig, SortDirection};
use anyhow::Result;
use serde_json::json;

const DESCRIPTION_PREVIEW_CHARS: usize = 140;

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}

fn format_messages(md: &mut String, messages: &[ValidationMessage]) {
    if messages.is_empty() {
        return;
    }
    md.push_str("> **Ignored or flagged input**\n");
    for m in messages {
        md.push_str(&format!("> - `{}`: {}\n", m.field, m.message));
    }
    md.push('\n');
}

/// Filtered polls as markdown, with any validation messages up front
pub fn format_polls(polls: &[Poll], total: usize, sort: &SortConfig, messages: &[ValidationMessage]) -> String {
    let mut md = String::new();
    md.push_str(&format!(
        "# Polls · {} of {} · sorted by {}\n\n",
        polls.len(),
        total,
        sort.primary_key
    ));
    format_messages(&mut md, messages);

    if polls.is_empty() {
        md.push_str("No polls match the current filters.\n");
        return md;
    }

    for poll in polls {
        md.push_str(&format!("## {}\n", poll.title));
        md.push_str(&format!(
            "{} · {} · {} participants\n",
            poll.category, poll.status, poll.participant_count
        ));
        md.push_str(&format!(
            "{} → {}",
            poll.start_date.format("%Y-%m-%d"),
            poll.end_date.format("%Y-%m-%d")
        ));
        if let Some(creator) = &poll.creator {
            md.push_str(&format!(" · by {}", creator));
        }
        md.push_str("\n\n");
        if !poll.description.trim().is_empty() {
            md.push_str(&format!("> {}\n\n", preview(&poll.description)));
        }
    }
    md
}

pub fn polls_json(polls: &[Poll], total: usize, messages: &[ValidationMessage]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json!({
        "total": total,
        "count": polls.len(),
        "polls": polls,
        "messages": messages,
    }))?)
}

/// Suggestions as a markdown list, matched text in bold
pub fn format_suggestions(query: &str, suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return format!("No suggestions for \"{}\".\n", query.trim());
    }
    let mut md = format!("# Suggestions · \"{}\"\n\n", query.trim());
    for s in suggestions {
        let value = match &s.highlight {
            Some(h) => h.apply(&s.value),
            None => s.value.clone(),
        };
        md.push_str(&format!(
            "- {} _({}, {})_\n",
            value,
            serde_json::to_value(s.source_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            s.score
        ));
    }
    md
}

pub fn suggestions_json(suggestions: &[Suggestion]) -> Result<String> {
    Ok(serde_json::to_string_pretty(suggestions)?)
}

pub fn format_history(entries: &[String]) -> String {
    if entries.is_empty() {
        return "Search history is empty.\n".to_string();
    }
    let mut md = String::from("# Search history\n\n");
    for (i, entry) in entries.iter().enumerate() {
        md.push_str(&format!("{}. {}\n", i + 1, entry));
    }
    md
}

pub fn format_presets(presets: &[FilterPreset]) -> String {
    if presets.is_empty() {
        return "No saved presets.\n".to_string();
    }
    let mut md = String::from("# Filter presets\n\n");
    for preset in presets {
        let (state, sort) = preset.apply();
        let mut parts = Vec::new();
        if !state.categories.is_empty() {
            parts.push(format!("categories: {}", state.categories.join(", ")));
        }
        if !state.statuses.is_empty() {
            let statuses: Vec<&str> = state.statuses.iter().map(PollStatus::as_str).collect();
            parts.push(format!("statuses: {}", statuses.join(", ")));
        }
        if state.date_range.start.is_some() || state.date_range.end.is_some() {
            let day = |d: Option<chrono::DateTime<chrono::Utc>>| {
                d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_else(|| "…".to_string())
            };
            parts.push(format!(
                "dates: {} → {}",
                day(state.date_range.start),
                day(state.date_range.end)
            ));
        }
        let direction = match sort.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        let mut sort_desc = format!("sort: {} {}", sort.primary_key, direction);
        if let Some(secondary) = sort.secondary_key {
            sort_desc.push_str(&format!(" then {}", secondary));
        }
        parts.push(sort_desc);
        md.push_str(&format!("- **{}** · {}\n", preset.name, parts.join(" · ")));
    }
    md
}

pub fn format_facets(
    categories: &[(String, usize)],
    creators: &[String],
    statuses: &[(PollStatus, usize)],
) -> String {
    let mut md = String::from("# Categories\n\n");
    if categories.is_empty() {
        md.push_str("_none_\n");
    }
    for (category, count) in categories {
        md.push_str(&format!("- {} ({})\n", category, count));
    }
    md.push_str("\n# Statuses\n\n");
    for (status, count) in statuses {
        md.push_str(&format!("- {} ({})\n", status, count));
    }
    md.push_str("\n# Creators\n\n");
    if creators.is_empty() {
        md.push_str("_none_\n");
    }
    for creator in creators {
        md.push_str(&format!("- {}\n", creator));
    }
    md
}

pub fn facets_json(
    categories: &[(String, usize)],
    creators: &[String],
    statuses: &[(PollStatus, usize)],
) -> Result<String> {
    let categories: Vec<_> = categories
        .iter()
        .map(|(name, count)| json!({ "name": name, "count": count }))
        .collect();
    let statuses: Vec<_> = statuses
        .iter()
        .map(|(status, count)| json!({ "status": status, "count": count }))
        .collect();
    Ok(serde_json::to_string_pretty(&json!({
        "categories": categories,
        "statuses": statuses,
        "creators": creators,
    }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::records::fixtures::sample_polls;
    use crate::search::fuzzy::Highlight;
    use crate::search::suggest::SourceType;

    #[test]
    fn test_format_polls() {
        let polls = sample_polls();
        let messages = vec![ValidationMessage::new(
            "dateRange.start",
            &AppError::InvalidDate("soon".to_string()),
        )];
        let md = format_polls(&polls[..1], 5, &SortConfig::default(), &messages);
        assert!(md.starts_with("# Polls · 1 of 5 · sorted by newest"));
        assert!(md.contains("`dateRange.start`: Invalid date: soon"));
        assert!(md.contains("## Best Programming Language 2024"));
        assert!(md.contains("Technology · Active · 1250 participants"));
        assert!(md.contains("2024-03-01 → 2024-03-15 · by alice"));
    }

    #[test]
    fn test_format_polls_empty() {
        let md = format_polls(&[], 5, &SortConfig::default(), &[]);
        assert!(md.contains("No polls match"));
    }

    #[test]
    fn test_format_suggestions_highlights() {
        let suggestions = vec![Suggestion {
            value: "Climate Change Solutions".to_string(),
            source_type: SourceType::Title,
            score: 15,
            record_id: Some("poll-2".to_string()),
            highlight: Some(Highlight { start: 0, len: 7 }),
        }];
        let md = format_suggestions("climate", &suggestions);
        assert!(md.contains("- **Climate** Change Solutions _(title, 15)_"));

        let json = suggestions_json(&suggestions).unwrap();
        assert!(json.contains("\"sourceType\": \"title\""));
        assert!(json.contains("\"recordId\": \"poll-2\""));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "word ".repeat(60);
        let short = preview(&long);
        assert!(short.ends_with('…'));
        assert!(short.chars().count() <= DESCRIPTION_PREVIEW_CHARS + 1);
    }

    #[test]
    fn test_polls_json_shape() {
        let polls = sample_polls();
        let out = polls_json(&polls[..2], 5, &[]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total"], 5);
        assert_eq!(value["count"], 2);
        assert_eq!(value["polls"][0]["participantCount"], 1250);
    }
}
