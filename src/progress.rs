//! Cross-session progress
//!
//! Unlocked levels, best scores and lifetime totals. Every mutation is
//! written straight back to disk; a failed write is logged and retried on
//! the next mutation, never surfaced as a fatal error.

use std::collections::BTreeMap;
use std::fs::{File, rename};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::score::best_score;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    /// Highest playable level id (never below 1)
    pub unlocked_levels: u32,
    /// Best score per level id (string keys, as stored on disk)
    pub level_scores: BTreeMap<String, u64>,
    /// Seconds of simulated play across all attempts
    pub total_time: f64,
    pub total_deaths: u64,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            unlocked_levels: 1,
            level_scores: BTreeMap::new(),
            total_time: 0.0,
            total_deaths: 0,
        }
    }
}

/// What a completion changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Best score after this completion
    pub best: u64,
    /// The new score beat the previous record (or there was none)
    pub new_best: bool,
    /// Level id unlocked by this completion
    pub unlocked: Option<u32>,
    /// The record reached disk
    pub saved: bool,
}

impl ProgressRecord {
    /// Repair fields a hand-edited or damaged file could carry
    pub fn sanitized(mut self) -> Self {
        self.unlocked_levels = self.unlocked_levels.max(1);
        if !self.total_time.is_finite() || self.total_time < 0.0 {
            self.total_time = 0.0;
        }
        self
    }

    pub fn best_score(&self, level_id: u32) -> Option<u64> {
        self.level_scores.get(&level_id.to_string()).copied()
    }

    pub fn is_unlocked(&self, level_id: u32) -> bool {
        (1..=self.unlocked_levels).contains(&level_id)
    }

    pub fn levels_completed(&self) -> usize {
        self.level_scores.len()
    }

    /// Fold a completion into the record
    pub fn apply_completion(&mut self, level_id: u32, score: u64, elapsed_secs: f64) -> CompletionOutcome {
        let key = level_id.to_string();
        let previous = self.level_scores.get(&key).copied();
        let best = best_score(previous, score);
        self.level_scores.insert(key, best);

        let unlocked = if level_id == self.unlocked_levels {
            self.unlocked_levels = level_id.saturating_add(1);
            Some(self.unlocked_levels)
        } else {
            None
        };

        self.add_time(elapsed_secs);

        CompletionOutcome {
            best,
            new_best: previous.is_none_or(|p| score > p),
            unlocked,
            saved: false,
        }
    }

    fn add_time(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.total_time += secs;
        }
    }
}

/// Owns the record and where it lives
#[derive(Debug)]
pub struct ProgressStore {
    record: ProgressRecord,
    path: Option<PathBuf>,
}

impl ProgressStore {
    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            record: ProgressRecord::default(),
            path: None,
        }
    }

    /// Open a store backed by `path`, loading whatever is there.
    ///
    /// A missing file is created with defaults.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let existed = path.exists();
        let record = Self::load(&path);
        let store = Self {
            record,
            path: Some(path),
        };
        if !existed {
            store.persist_logged();
        }
        store
    }

    /// Read a record, falling back to defaults if absent or corrupt
    pub fn load(path: &Path) -> ProgressRecord {
        match Self::read_from_path(path) {
            Ok(record) => {
                log::info!(
                    "Loaded progress: {} unlocked, {} completed",
                    record.unlocked_levels,
                    record.levels_completed()
                );
                record
            }
            Err(ProgressError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No progress found, starting fresh");
                ProgressRecord::default()
            }
            Err(e) => {
                log::warn!("Progress at {} unreadable ({e}), starting fresh", path.display());
                ProgressRecord::default()
            }
        }
    }

    fn read_from_path(path: &Path) -> Result<ProgressRecord, ProgressError> {
        let json = std::fs::read_to_string(path)?;
        let record: ProgressRecord = serde_json::from_str(&json)?;
        Ok(record.sanitized())
    }

    fn write_to_path(path: &Path, record: &ProgressRecord) -> Result<(), ProgressError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(record)?;

        // Atomic save: write to temp file, then rename
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
        }
        rename(&temp_path, path)?;

        log::debug!("Saved {} bytes to {}", json.len(), path.display());
        Ok(())
    }

    /// Write the full record. In-memory stores always succeed.
    pub fn persist(&self) -> Result<(), ProgressError> {
        match &self.path {
            Some(path) => Self::write_to_path(path, &self.record),
            None => Ok(()),
        }
    }

    /// Persist, logging instead of propagating failures
    fn persist_logged(&self) -> bool {
        match self.persist() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not save progress: {e}");
                false
            }
        }
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Level won: best score, unlock, play time
    pub fn record_completion(&mut self, level_id: u32, score: u64, elapsed_secs: f64) -> CompletionOutcome {
        let mut outcome = self.record.apply_completion(level_id, score, elapsed_secs);
        if let Some(next) = outcome.unlocked {
            log::info!("Unlocked level {next}");
        }
        if outcome.new_best {
            log::info!("New best on level {level_id}: {}", outcome.best);
        }
        outcome.saved = self.persist_logged();
        outcome
    }

    /// One life lost. Returns whether the record reached disk.
    pub fn record_death(&mut self) -> bool {
        self.record.total_deaths = self.record.total_deaths.saturating_add(1);
        self.persist_logged()
    }

    /// Play time from an attempt that did not end in a completion
    pub fn record_play_time(&mut self, elapsed_secs: f64) -> bool {
        self.record.add_time(elapsed_secs);
        self.persist_logged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let record = ProgressRecord::default();
        assert_eq!(record.unlocked_levels, 1);
        assert!(record.level_scores.is_empty());
        assert_eq!(record.total_time, 0.0);
        assert_eq!(record.total_deaths, 0);
        assert!(record.is_unlocked(1));
        assert!(!record.is_unlocked(2));
        assert!(!record.is_unlocked(0));
    }

    #[test]
    fn test_best_score_is_kept() {
        let mut store = ProgressStore::in_memory();
        for score in [9_200, 9_850, 9_000] {
            store.record_completion(2, score, 1.0);
        }
        assert_eq!(store.record().best_score(2), Some(9_850));
        assert_eq!(store.record().levels_completed(), 1);
        assert!((store.record().total_time - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_best_flag() {
        let mut record = ProgressRecord::default();
        assert!(record.apply_completion(1, 9_000, 1.0).new_best);
        assert!(!record.apply_completion(1, 8_000, 1.0).new_best);
        assert!(!record.apply_completion(1, 9_000, 1.0).new_best);
        assert!(record.apply_completion(1, 9_500, 1.0).new_best);
    }

    #[test]
    fn test_unlock_only_from_frontier() {
        let mut record = ProgressRecord {
            unlocked_levels: 3,
            ..Default::default()
        };
        let outcome = record.apply_completion(3, 9_000, 2.0);
        assert_eq!(outcome.unlocked, Some(4));
        assert_eq!(record.unlocked_levels, 4);

        let mut record = ProgressRecord {
            unlocked_levels: 5,
            ..Default::default()
        };
        let outcome = record.apply_completion(3, 9_000, 2.0);
        assert_eq!(outcome.unlocked, None);
        assert_eq!(record.unlocked_levels, 5);
    }

    #[test]
    fn test_round_trip() {
        let mut record = ProgressRecord {
            unlocked_levels: 4,
            total_time: 123.5,
            total_deaths: 17,
            ..Default::default()
        };
        record.level_scores.insert("1".into(), 9_990);
        record.level_scores.insert("3".into(), 7_120);

        let json = serde_json::to_string(&record).unwrap();
        let back: ProgressRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_reads_hand_written_layout() {
        let json = r#"{
            "unlocked_levels": 3,
            "level_scores": { "1": 9400, "2": 8710 },
            "total_time": 41.25,
            "total_deaths": 6
        }"#;
        let record: ProgressRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.best_score(2), Some(8_710));
        assert_eq!(record.total_deaths, 6);
    }

    #[test]
    fn test_open_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("save_data.json");

        let store = ProgressStore::open(&path);
        assert_eq!(store.record(), &ProgressRecord::default());
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_mutations_persist_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("save_data.json");

        let mut store = ProgressStore::open(&path);
        let outcome = store.record_completion(1, 9_990, 0.5);
        assert!(outcome.saved);
        assert!(store.record_death());

        let reloaded = ProgressStore::load(&path);
        assert_eq!(&reloaded, store.record());
        assert_eq!(reloaded.unlocked_levels, 2);
        assert_eq!(reloaded.total_deaths, 1);

        // Temp file should not exist
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("save_data.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let store = ProgressStore::open(&path);
        assert_eq!(store.record(), &ProgressRecord::default());
    }

    #[test]
    fn test_out_of_range_fields_are_repaired() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("save_data.json");
        std::fs::write(&path, r#"{ "unlocked_levels": 0, "total_time": -4.0 }"#).unwrap();

        let record = ProgressStore::load(&path);
        assert_eq!(record.unlocked_levels, 1);
        assert_eq!(record.total_time, 0.0);
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes every write fail
        let path = temp_dir.path().join("blocked");
        std::fs::create_dir_all(path.with_extension("tmp")).unwrap();

        let mut store = ProgressStore::open(&path);
        let outcome = store.record_completion(1, 9_000, 1.0);
        assert!(!outcome.saved);
        assert!(!store.record_death());

        // In-memory state still advanced
        assert_eq!(store.record().unlocked_levels, 2);
        assert_eq!(store.record().total_deaths, 1);
        assert!(store.persist().is_err());
    }
}
