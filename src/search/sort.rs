//! Sort engine
//!
//! Each [`SortKey`] maps to one base comparator. The configured direction
//! flips the primary comparator only; the secondary key always runs in its
//! natural direction. Sorting is stable for every key except `Random`.

use super::normalize::collate;
use crate::error::AppError;
use crate::records::Poll;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Newest,
    Oldest,
    ParticipantsDesc,
    ParticipantsAsc,
    TitleAsc,
    TitleDesc,
    Category,
    Status,
    EndDateAsc,
    StartDateAsc,
    Relevance,
    Trending,
    Random,
}

impl SortKey {
    pub const ALL: [SortKey; 13] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::ParticipantsDesc,
        SortKey::ParticipantsAsc,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
        SortKey::Category,
        SortKey::Status,
        SortKey::EndDateAsc,
        SortKey::StartDateAsc,
        SortKey::Relevance,
        SortKey::Trending,
        SortKey::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::ParticipantsDesc => "participantsDesc",
            SortKey::ParticipantsAsc => "participantsAsc",
            SortKey::TitleAsc => "titleAsc",
            SortKey::TitleDesc => "titleDesc",
            SortKey::Category => "category",
            SortKey::Status => "status",
            SortKey::EndDateAsc => "endDateAsc",
            SortKey::StartDateAsc => "startDateAsc",
            SortKey::Relevance => "relevance",
            SortKey::Trending => "trending",
            SortKey::Random => "random",
        }
    }

    /// Base comparator for this key, before any direction is applied
    pub fn comparator(self) -> Comparator {
        match self {
            SortKey::Newest => |a, b, _| b.start_date.cmp(&a.start_date),
            SortKey::Oldest => |a, b, _| a.start_date.cmp(&b.start_date),
            SortKey::ParticipantsDesc => |a, b, _| b.participant_count.cmp(&a.participant_count),
            SortKey::ParticipantsAsc => |a, b, _| a.participant_count.cmp(&b.participant_count),
            SortKey::TitleAsc => |a, b, _| collate(&a.title, &b.title),
            SortKey::TitleDesc => |a, b, _| collate(&b.title, &a.title),
            SortKey::Category => |a, b, _| collate(&a.category, &b.category),
            SortKey::Status => |a, b, _| collate(a.status.as_str(), b.status.as_str()),
            SortKey::EndDateAsc => |a, b, _| a.end_date.cmp(&b.end_date),
            SortKey::StartDateAsc => |a, b, _| a.start_date.cmp(&b.start_date),
            SortKey::Relevance => |a, b, ctx| ctx.relevance(b).total_cmp(&ctx.relevance(a)),
            SortKey::Trending => |a, b, ctx| ctx.trending(b).total_cmp(&ctx.trending(a)),
            SortKey::Random => |_, _, _| random_ordering(),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    /// Accepts the camelCase names plus the legacy snake_case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.trim() {
            "newest" => SortKey::Newest,
            "oldest" => SortKey::Oldest,
            "participantsDesc" | "participants" => SortKey::ParticipantsDesc,
            "participantsAsc" | "participants_asc" => SortKey::ParticipantsAsc,
            "titleAsc" | "title" => SortKey::TitleAsc,
            "titleDesc" | "title_desc" => SortKey::TitleDesc,
            "category" => SortKey::Category,
            "status" => SortKey::Status,
            "endDateAsc" | "end_date" => SortKey::EndDateAsc,
            "startDateAsc" | "start_date" => SortKey::StartDateAsc,
            "relevance" => SortKey::Relevance,
            "trending" => SortKey::Trending,
            "random" => SortKey::Random,
            other => return Err(AppError::InvalidSortKey(other.to_string())),
        };
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Keep the key's natural order
    #[default]
    Asc,
    /// Reverse the primary key's order
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(AppError::InvalidSortKey(format!("direction {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    pub primary_key: SortKey,
    #[serde(default)]
    pub secondary_key: Option<SortKey>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            primary_key: SortKey::Newest,
            secondary_key: None,
            direction: SortDirection::Asc,
        }
    }
}

/// Reference time for the derived scores
#[derive(Debug, Clone, Copy)]
pub struct SortContext {
    pub now: DateTime<Utc>,
}

impl SortContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// `participantCount + ageInDays`
    pub fn relevance(&self, poll: &Poll) -> f64 {
        poll.participant_count as f64 + poll.age_in_days(self.now)
    }

    /// `participantCount / max(1, ageInDays)`
    pub fn trending(&self, poll: &Poll) -> f64 {
        poll.participant_count as f64 / poll.age_in_days(self.now).max(1.0)
    }
}

pub type Comparator = fn(&Poll, &Poll, &SortContext) -> Ordering;

fn random_ordering() -> Ordering {
    match rand::thread_rng().gen_range(0..3) {
        0 => Ordering::Less,
        1 => Ordering::Equal,
        _ => Ordering::Greater,
    }
}

/// Compare two polls under `config`. With `Random` as primary key the result
/// is arbitrary and the secondary key and direction are ignored.
pub fn compare(a: &Poll, b: &Poll, config: &SortConfig, ctx: &SortContext) -> Ordering {
    if config.primary_key == SortKey::Random {
        return random_ordering();
    }
    let primary = config.direction.apply((config.primary_key.comparator())(a, b, ctx));
    match config.secondary_key {
        Some(secondary) if secondary != SortKey::Random => {
            primary.then_with(|| (secondary.comparator())(a, b, ctx))
        }
        _ => primary,
    }
}

/// Order `polls` in place. Stable for every key but `Random`, which shuffles.
pub fn sort_polls<P: Borrow<Poll>>(polls: &mut [P], config: &SortConfig, ctx: &SortContext) {
    if config.primary_key == SortKey::Random {
        polls.shuffle(&mut rand::thread_rng());
        return;
    }
    polls.sort_by(|a, b| compare(a.borrow(), b.borrow(), config, ctx));
}
