//! pollfinder: discovery engine for poll listings
//!
//! Three entry points cover what a listing screen needs:
//! - [`filter_and_sort`] narrows a record set by a [`FilterState`] and orders it by a [`SortConfig`]
//! - [`suggest`] proposes completions for a partially typed query, backed by a [`HistoryStore`]
//! - [`spawn_debounced`] / [`Debouncer`] hold back rapidly changing queries until they settle
//!
//! Everything under [`search`] is synchronous and free of I/O. Record loading,
//! history files, presets and configuration live in their own modules; [`cli`]
//! and [`output`] back the `pollfinder` binary.

pub mod cli;
pub mod config;
pub mod debounce;
pub mod error;
pub mod history;
pub mod output;
pub mod presets;
pub mod records;
pub mod search;

pub use debounce::{debounce_channel, spawn_debounced, DebounceOptions, Debouncer, EmitReason, Emission};
pub use error::{AppError, ValidationMessage};
pub use history::{FileHistory, HistoryStore, MemoryHistory, SharedHistory};
pub use records::{load_polls, Poll, PollStatus};
pub use search::filter::FilterState;
pub use search::sort::{SortConfig, SortDirection, SortKey};
pub use search::suggest::{SourceType, Suggestion};
pub use search::{filter_and_sort, filter_and_sort_at, suggest};
