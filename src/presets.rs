//! Saved filter presets and relative date presets

use crate::error::AppError;
use crate::history::write_json_atomic;
use crate::records::PollStatus;
use crate::search::filter::{DateRange, FilterState};
use crate::search::sort::{SortConfig, SortDirection, SortKey};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// A named snapshot of the filter panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPreset {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<PollStatus>,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_sort: Option<SortKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
}

impl FilterPreset {
    /// Capture the parts of `state` and `sort` a preset remembers
    pub fn capture(name: &str, state: &FilterState, sort: &SortConfig) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Preset name cannot be empty".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            categories: state.categories.clone(),
            statuses: state.statuses.clone(),
            date_range: state.date_range,
            sort_by: Some(sort.primary_key),
            secondary_sort: sort.secondary_key,
            sort_direction: Some(sort.direction),
        })
    }

    /// Filter and sort settings this preset stands for.
    ///
    /// Everything the preset does not cover (search text, tab, participants,
    /// creators) starts out unconstrained.
    pub fn apply(&self) -> (FilterState, SortConfig) {
        let state = FilterState {
            categories: self.categories.clone(),
            statuses: self.statuses.clone(),
            date_range: self.date_range,
            ..FilterState::default()
        };
        let sort = SortConfig {
            primary_key: self.sort_by.unwrap_or(SortKey::Newest),
            secondary_key: self.secondary_sort,
            direction: self.sort_direction.unwrap_or_default(),
        };
        (state, sort)
    }
}

/// Presets kept in a JSON file, in save order
#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    presets: Vec<FilterPreset>,
}

impl PresetStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let presets = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data).map_err(|e| {
                AppError::Storage(format!("Failed to parse presets file {}: {}", path.display(), e))
            })?
        } else {
            Vec::new()
        };
        Ok(Self { path, presets })
    }

    /// Default location: `<data_dir>/pollfinder/presets.json`
    pub fn default_path() -> Result<PathBuf, AppError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| AppError::Config("Could not find data directory".to_string()))?;
        Ok(data_dir.join("pollfinder").join("presets.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[FilterPreset] {
        &self.presets
    }

    pub fn get(&self, name: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.name == name.trim())
    }

    /// Store `preset`, replacing any preset with the same name
    pub fn save(&mut self, preset: FilterPreset) -> Result<(), AppError> {
        let replaced = self.presets.iter().any(|p| p.name == preset.name);
        self.presets.retain(|p| p.name != preset.name);
        info!(
            "{} preset '{}'",
            if replaced { "Replacing" } else { "Saving" },
            preset.name
        );
        self.presets.push(preset);
        self.persist()
    }

    pub fn delete(&mut self, name: &str) -> Result<FilterPreset, AppError> {
        let idx = self
            .presets
            .iter()
            .position(|p| p.name == name.trim())
            .ok_or_else(|| AppError::NotFound(format!("Preset '{}'", name.trim())))?;
        let removed = self.presets.remove(idx);
        self.persist()?;
        Ok(removed)
    }

    /// Look up a preset and expand it into filter and sort settings
    pub fn apply(&self, name: &str) -> Result<(FilterState, SortConfig), AppError> {
        let preset = self
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Preset '{}'", name.trim())))?;
        debug!("Applying preset '{}'", preset.name);
        Ok(preset.apply())
    }

    fn persist(&self) -> Result<(), AppError> {
        write_json_atomic(&self.path, &self.presets)
    }
}

/// Date range shortcuts relative to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePreset {
    Today,
    Last7Days,
    Last30Days,
    Any,
}

impl DatePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePreset::Today => "today",
            DatePreset::Last7Days => "last7Days",
            DatePreset::Last30Days => "last30Days",
            DatePreset::Any => "any",
        }
    }

    /// Range covering the preset, both ends at midnight UTC and inclusive
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        let days_back = match self {
            DatePreset::Today => 0,
            DatePreset::Last7Days => 6,
            DatePreset::Last30Days => 29,
            DatePreset::Any => return DateRange::default(),
        };
        let start = today.checked_sub_days(Days::new(days_back)).unwrap_or(today);
        DateRange {
            start: start.and_hms_opt(0, 0, 0).map(|d| d.and_utc()),
            end: today.and_hms_opt(0, 0, 0).map(|d| d.and_utc()),
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatePreset {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "today" => Ok(DatePreset::Today),
            "last7days" | "week" => Ok(DatePreset::Last7Days),
            "last30days" | "month" => Ok(DatePreset::Last30Days),
            "any" | "all" => Ok(DatePreset::Any),
            _ => Err(AppError::InvalidInput(format!("Unknown date preset: {}", s))),
        }
    }
}
