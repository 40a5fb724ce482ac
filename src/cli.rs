//! CLI argument model

use crate::search::filter::FilterInput;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pollfinder CLI
#[derive(Parser, Debug)]
#[command(name = "pollfinder")]
#[command(about = "Fuzzy search, filtering, ranking and query suggestions for poll listings", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to <config dir>/pollfinder/config.json)
    #[arg(long, global = true, env = "POLLFINDER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filter and sort polls
    Filter(FilterArgs),
    /// Suggest query completions
    Suggest(SuggestArgs),
    /// Inspect or clear the search history
    History(HistoryArgs),
    /// Manage saved filter presets
    Presets(PresetsArgs),
    /// List categories and creators with counts
    Categories(CategoriesArgs),
    /// Read queries from stdin, suggesting on every line and filtering once typing settles
    Interactive(InteractiveArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Polls file and output format, shared by every record-reading command
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// JSON file with an array of polls
    #[arg(short = 'r', long, env = "POLLFINDER_RECORDS")]
    pub records: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,
}

/// Filter selections as typed by the user
#[derive(Args, Debug, Clone, Default)]
pub struct FilterFlags {
    /// Free-text search (fuzzy for short words)
    #[arg(short = 'q', long, default_value = "")]
    pub query: String,

    /// Category substring; repeat for several
    #[arg(short = 'c', long = "category")]
    pub categories: Vec<String>,

    /// Status (active, upcoming, completed); repeat for several
    #[arg(short = 's', long = "status")]
    pub statuses: Vec<String>,

    /// Single status tab used when no --status is given ("all" for none)
    #[arg(long)]
    pub tab: Option<String>,

    /// Earliest date (YYYY-MM-DD or RFC 3339) the poll must still be running
    #[arg(long)]
    pub from: Option<String>,

    /// Latest date (YYYY-MM-DD or RFC 3339) the poll must have started by
    #[arg(long)]
    pub to: Option<String>,

    /// Relative date range: today, last7days, last30days, any
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub date: Option<String>,

    /// Minimum participant count
    #[arg(long)]
    pub min_participants: Option<String>,

    /// Maximum participant count
    #[arg(long)]
    pub max_participants: Option<String>,

    /// Creator name; repeat for several
    #[arg(long = "creator")]
    pub creators: Vec<String>,
}

impl FilterFlags {
    pub fn to_input(&self) -> FilterInput {
        FilterInput {
            search_query: self.query.clone(),
            categories: self.categories.clone(),
            statuses: self.statuses.clone(),
            active_tab: self.tab.clone(),
            date_start: self.from.clone(),
            date_end: self.to.clone(),
            participants_min: self.min_participants.clone(),
            participants_max: self.max_participants.clone(),
            creators: self.creators.clone(),
        }
    }
}

/// Sort selection
#[derive(Args, Debug, Clone, Default)]
pub struct SortFlags {
    /// Primary sort key (newest, oldest, participantsDesc, titleAsc, relevance, trending, random, ...)
    #[arg(long)]
    pub sort: Option<String>,

    /// Tie-break sort key
    #[arg(long)]
    pub then: Option<String>,

    /// Direction applied to the primary key (asc, desc)
    #[arg(long)]
    pub direction: Option<String>,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filter: FilterFlags,

    #[command(flatten)]
    pub sort: SortFlags,

    /// Start from a saved preset; explicit flags are applied on top
    #[arg(short = 'p', long)]
    pub preset: Option<String>,

    /// Maximum number of polls to print
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Partial query
    pub query: String,

    /// Maximum number of suggestions
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Do not read or record search history
    #[arg(long)]
    pub no_history: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Show recent accepted queries, newest first
    List,
    /// Forget every recorded query
    Clear,
}

#[derive(Args, Debug)]
pub struct PresetsArgs {
    #[command(subcommand)]
    pub command: PresetsCommands,
}

#[derive(Subcommand, Debug)]
pub enum PresetsCommands {
    /// List saved presets
    List,
    /// Save the given filter and sort flags under a name (replaces an existing one)
    Save {
        /// Preset name
        name: String,

        #[command(flatten)]
        filter: FilterFlags,

        #[command(flatten)]
        sort: SortFlags,
    },
    /// Delete a preset
    Delete {
        /// Preset name
        name: String,
    },
    /// Print one preset as JSON
    Show {
        /// Preset name
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only values containing this text
    #[arg(short = 'q', long)]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub sort: SortFlags,

    /// Maximum number of suggestions per line
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Debounce delay for the filtered list, in milliseconds
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}
