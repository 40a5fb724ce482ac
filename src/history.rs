//! Search history storage
//!
//! Accepted queries, most recent first, bounded and deduplicated by
//! normalized equality. The suggestion engine only sees the [`HistoryStore`]
//! trait; where the list lives is up to the host.

use crate::error::AppError;
use crate::search::normalize::normalize;
use fs2::FileExt;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Narrow read/push interface to a history list
pub trait HistoryStore {
    /// Entries, most recent first
    fn read(&self) -> Vec<String>;
    /// Front-insert `value`, dropping any entry equal to it after normalization
    fn push(&mut self, value: &str) -> Result<(), AppError>;
}

/// Front-insert with dedup and capacity bound
fn push_bounded(entries: &mut Vec<String>, value: &str, capacity: usize) {
    let key = normalize(value);
    entries.retain(|e| normalize(e) != key);
    entries.insert(0, value.to_string());
    entries.truncate(capacity);
}

/// In-memory history
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    capacity: usize,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl MemoryHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Seed from an existing list (most recent first); dedup and bound still apply
    pub fn from_entries<I, S>(entries: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut history = Self::with_capacity(capacity);
        let entries: Vec<S> = entries.into_iter().collect();
        for entry in entries.iter().rev() {
            push_bounded(&mut history.entries, entry.as_ref(), capacity);
        }
        history
    }
}

impl HistoryStore for MemoryHistory {
    fn read(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn push(&mut self, value: &str) -> Result<(), AppError> {
        push_bounded(&mut self.entries, value, self.capacity);
        Ok(())
    }
}

/// History persisted as a JSON array in a file
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    entries: Vec<String>,
    capacity: usize,
}

impl FileHistory {
    /// Open (or lazily create) the history file at `path`
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, AppError> {
        let path = path.into();
        let entries = if path.exists() {
            let data = fs::read_to_string(&path)?;
            let stored: Vec<String> = serde_json::from_str(&data).map_err(|e| {
                AppError::Storage(format!("Failed to parse history file {}: {}", path.display(), e))
            })?;
            MemoryHistory::from_entries(stored, capacity).entries
        } else {
            Vec::new()
        };
        debug!("Opened history {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries,
            capacity,
        })
    }

    /// Default location: `<data_dir>/pollfinder/history.json`
    pub fn default_path() -> Result<PathBuf, AppError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| AppError::Config("Could not find data directory".to_string()))?;
        Ok(data_dir.join("pollfinder").join("history.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove every entry and persist the empty list
    pub fn clear(&mut self) -> Result<(), AppError> {
        self.replace(Vec::new())
    }

    /// Persist `next`, then adopt it; a failed write leaves memory untouched
    fn replace(&mut self, next: Vec<String>) -> Result<(), AppError> {
        write_json_atomic(&self.path, &next)?;
        self.entries = next;
        Ok(())
    }
}

/// Write `value` as pretty JSON next to `path`, then rename over it under an
/// exclusive lock file
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_path = path.with_extension("lock");
    let lock_file = fs::File::create(&lock_path)?;
    lock_file.lock_exclusive()?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp_path, path)?;

    lock_file.unlock()?;
    let _ = fs::remove_file(lock_path);
    Ok(())
}

impl HistoryStore for FileHistory {
    fn read(&self) -> Vec<String> {
        self.entries.clone()
    }

    fn push(&mut self, value: &str) -> Result<(), AppError> {
        let mut next = self.entries.clone();
        push_bounded(&mut next, value, self.capacity);
        self.replace(next)
    }
}

/// Any store behind a mutex, for hosts that share history across threads
#[derive(Debug)]
pub struct SharedHistory<H> {
    inner: Arc<Mutex<H>>,
}

impl<H> Clone for SharedHistory<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: HistoryStore> SharedHistory<H> {
    pub fn new(store: H) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }
}

impl<H: HistoryStore> HistoryStore for SharedHistory<H> {
    fn read(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(store) => store.read(),
            Err(poisoned) => {
                warn!("History lock poisoned, reading anyway");
                poisoned.into_inner().read()
            }
        }
    }

    fn push(&mut self, value: &str) -> Result<(), AppError> {
        let mut store = self
            .inner
            .lock()
            .map_err(|_| AppError::Storage("History lock poisoned".to_string()))?;
        store.push(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_front_dedup_and_cap() {
        let mut history = MemoryHistory::with_capacity(3);
        for q in ["tech", "climate", "movies", "Café"] {
            history.push(q).unwrap();
        }
        assert_eq!(history.read(), vec!["Café", "movies", "climate"]);

        history.push("CAFE").unwrap();
        assert_eq!(history.read(), vec!["CAFE", "movies", "climate"]);
    }

    #[test]
    fn test_from_entries_keeps_order() {
        let history = MemoryHistory::from_entries(["a", "b", "A", "c"], 10);
        assert_eq!(history.read(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_file_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut history = FileHistory::open(&path, DEFAULT_HISTORY_CAPACITY).unwrap();
        assert!(history.read().is_empty());
        history.push("technology").unwrap();
        history.push("voting").unwrap();

        let reopened = FileHistory::open(&path, DEFAULT_HISTORY_CAPACITY).unwrap();
        assert_eq!(reopened.read(), vec!["voting", "technology"]);
        assert!(!path.with_extension("lock").exists());
    }

    #[test]
    fn test_file_history_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut history = FileHistory::open(&path, 5).unwrap();
        history.push("poll").unwrap();
        history.clear().unwrap();
        assert!(FileHistory::open(&path, 5).unwrap().read().is_empty());
    }

    #[test]
    fn test_failed_write_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let path = store.join("history.json");
        let mut history = FileHistory::open(&path, 5).unwrap();
        history.push("poll").unwrap();

        // a plain file where the directory was makes every write fail
        fs::remove_dir_all(&store).unwrap();
        fs::write(&store, "").unwrap();

        assert!(history.push("climate").is_err());
        assert_eq!(history.read(), vec!["poll"]);
        assert!(history.clear().is_err());
        assert_eq!(history.read(), vec!["poll"]);
    }

    #[test]
    fn test_file_history_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileHistory::open(&path, 5), Err(AppError::Storage(_))));
    }

    #[test]
    fn test_shared_history_across_threads() {
        let shared = SharedHistory::new(MemoryHistory::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let mut handle = shared.clone();
                std::thread::spawn(move || handle.push(&format!("query {}", i)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut entries = shared.read();
        entries.sort();
        assert_eq!(entries, vec!["query 0", "query 1", "query 2", "query 3"]);
    }
}
