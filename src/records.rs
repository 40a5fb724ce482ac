//! Poll record types
//!
//! Records are immutable inputs owned by an external store; this module only
//! defines their shape and how to read them from JSON.

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Lifecycle status of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollStatus {
    Active,
    Upcoming,
    #[serde(alias = "Past")]
    Completed,
}

impl PollStatus {
    pub const ALL: [PollStatus; 3] = [PollStatus::Active, PollStatus::Upcoming, PollStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Active => "Active",
            PollStatus::Upcoming => "Upcoming",
            PollStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PollStatus::Active),
            "upcoming" => Ok(PollStatus::Upcoming),
            "completed" | "past" => Ok(PollStatus::Completed),
            other => Err(AppError::InvalidInput(format!("Unknown poll status: {}", other))),
        }
    }
}

/// A single poll as seen by the discovery engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub status: PollStatus,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end_date: DateTime<Utc>,
    #[serde(default, alias = "totalVotes", alias = "participants")]
    pub participant_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

impl Poll {
    /// Text the free-text search runs over: title, category, description and creator
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.category.len() + self.description.len() + 3,
        );
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.category);
        text.push(' ');
        text.push_str(&self.description);
        if let Some(creator) = &self.creator {
            text.push(' ');
            text.push_str(creator);
        }
        text
    }

    /// Whole days elapsed between `start_date` and `now`, as a fraction
    pub fn age_in_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.start_date).num_milliseconds() as f64 / 86_400_000.0
    }

    fn check_interval(&self) -> Result<(), AppError> {
        if self.end_date < self.start_date {
            return Err(AppError::InvalidRange(format!(
                "poll {} ends ({}) before it starts ({})",
                self.id, self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

/// Parse a calendar timestamp: either `YYYY-MM-DD` (midnight UTC) or RFC 3339
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::InvalidDate(raw.to_string()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Parse a JSON array of polls, rejecting records whose interval is inverted
pub fn parse_polls(json: &str) -> Result<Vec<Poll>, AppError> {
    let polls: Vec<Poll> = serde_json::from_str(json)?;
    for poll in &polls {
        poll.check_interval()?;
    }
    Ok(polls)
}

/// Load polls from a JSON file
pub fn load_polls(path: &Path) -> Result<Vec<Poll>, AppError> {
    if !path.exists() {
        return Err(AppError::NotFound(format!("Records file {}", path.display())));
    }
    let data = std::fs::read_to_string(path)?;
    let polls = parse_polls(&data)?;
    debug!("Loaded {} polls from {}", polls.len(), path.display());
    Ok(polls)
}
