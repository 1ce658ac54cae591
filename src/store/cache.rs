//! File-backed content store.
//!
//! [`ContentStore`] keeps one JSON file per cache entry under two named
//! collections:
//!
//! ```text
//! <root>/chapters/GEN-1.json   CacheEntry { bookId, chapterNumber, chapter, storedAt }
//! <root>/daily/2026-10-19.json DailyEntry { date, verse, reference }
//! ```
//!
//! An in-memory key index is built when the store opens, so hit checks and
//! per-book counts never touch the disk.  Writes go to a temporary file that
//! is renamed over the target, so a crash mid-write never leaves a truncated
//! entry behind.
//!
//! Storage errors never reach callers as failures of the reading flow:
//! [`get`](ContentStore::get) degrades to a miss and
//! [`put`](ContentStore::put) logs before returning the error.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use super::entry::{CacheEntry, DailyEntry};
use crate::model::{Chapter, ChapterKey, DailyHighlight};

const CHAPTERS_DIR: &str = "chapters";
const DAILY_DIR: &str = "daily";

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ContentStore
// ---------------------------------------------------------------------------

/// Durable `(book, chapter) → chapter` map plus the daily-highlight cache.
///
/// Shared process-wide behind an `Arc`; every method takes `&self`.
pub struct ContentStore {
    chapters_dir: PathBuf,
    daily_dir: PathBuf,
    index: Mutex<HashSet<ChapterKey>>,
}

impl ContentStore {
    /// Open (creating if absent) the store rooted at `root`.
    ///
    /// Never fails: an unreadable directory yields an empty index and every
    /// later lookup is a miss.
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let chapters_dir = root.join(CHAPTERS_DIR);
        let daily_dir = root.join(DAILY_DIR);

        for dir in [&chapters_dir, &daily_dir] {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("store: cannot create {}: {e}", dir.display());
            }
        }

        let index = Self::scan_index(&chapters_dir);
        log::info!(
            "store: opened {} with {} cached chapters",
            root.display(),
            index.len()
        );

        Self {
            chapters_dir,
            daily_dir,
            index: Mutex::new(index),
        }
    }

    fn scan_index(dir: &Path) -> HashSet<ChapterKey> {
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            return HashSet::new();
        };

        read_dir
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let data = std::fs::read_to_string(&path).ok()?;
                match serde_json::from_str::<CacheEntry>(&data) {
                    Ok(entry) => Some(entry.key()),
                    Err(e) => {
                        log::warn!("store: skipping unreadable entry {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect()
    }

    fn index(&self) -> MutexGuard<'_, HashSet<ChapterKey>> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn chapter_path(&self, key: &ChapterKey) -> PathBuf {
        self.chapters_dir.join(format!("{}.json", key.composite()))
    }

    fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.daily_dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    // -----------------------------------------------------------------------
    // Chapter collection
    // -----------------------------------------------------------------------

    /// Look up a cached chapter.  Any storage-layer problem is reported as a
    /// miss.
    pub async fn get(&self, key: &ChapterKey) -> Option<Chapter> {
        if !self.is_cached(key) {
            return None;
        }

        let path = self.chapter_path(key);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) => {
                log::warn!("store: read {key} failed, treating as miss: {e}");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&data) {
            Ok(entry) if entry.key() == *key => Some(entry.chapter),
            Ok(entry) => {
                log::warn!("store: {} holds {}, treating as miss", path.display(), entry.key());
                None
            }
            Err(e) => {
                log::warn!("store: entry {key} is corrupt, treating as miss: {e}");
                None
            }
        }
    }

    /// Insert or overwrite the entry for `key`.
    ///
    /// A failure is logged here; callers may ignore the returned error.
    pub async fn put(&self, key: &ChapterKey, chapter: &Chapter) -> Result<(), StoreError> {
        let entry = CacheEntry::new(key, chapter.clone());
        let result = write_json(&self.chapters_dir, &self.chapter_path(key), &entry).await;

        match &result {
            Ok(()) => {
                self.index().insert(key.clone());
                log::debug!("store: cached {key}");
            }
            Err(e) => log::warn!("store: failed to cache {key}: {e}"),
        }
        result
    }

    /// Whether an entry exists for `key`.
    pub fn is_cached(&self, key: &ChapterKey) -> bool {
        self.index().contains(key)
    }

    /// Number of cached chapters belonging to `book_id`.
    pub fn count_cached_chapters(&self, book_id: &str) -> usize {
        self.index()
            .iter()
            .filter(|k| k.book_id() == book_id)
            .count()
    }

    // -----------------------------------------------------------------------
    // Daily-highlight collection
    // -----------------------------------------------------------------------

    pub async fn get_daily(&self, date: NaiveDate) -> Option<DailyHighlight> {
        let data = tokio::fs::read_to_string(self.daily_path(date)).await.ok()?;
        match serde_json::from_str::<DailyEntry>(&data) {
            Ok(entry) if entry.date == date => Some(entry.highlight),
            Ok(_) => None,
            Err(e) => {
                log::warn!("store: daily entry for {date} is corrupt: {e}");
                None
            }
        }
    }

    pub async fn put_daily(
        &self,
        date: NaiveDate,
        highlight: &DailyHighlight,
    ) -> Result<(), StoreError> {
        let entry = DailyEntry {
            date,
            highlight: highlight.clone(),
        };
        let result = write_json(&self.daily_dir, &self.daily_path(date), &entry).await;

        if let Err(e) = &result {
            log::warn!("store: failed to cache daily highlight for {date}: {e}");
        }
        result
    }
}

async fn write_json<T: Serialize>(dir: &Path, path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value)?;
    tokio::fs::create_dir_all(dir).await?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
