//! On-disk record shapes for the two store collections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Chapter, ChapterKey, DailyHighlight};

/// One cached chapter, stored as `chapters/<BOOK>-<n>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub book_id: String,
    pub chapter_number: u32,
    pub chapter: Chapter,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &ChapterKey, chapter: Chapter) -> Self {
        Self {
            book_id: key.book_id().to_string(),
            chapter_number: key.chapter(),
            chapter,
            stored_at: Utc::now(),
        }
    }

    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(self.book_id.clone(), self.chapter_number)
    }
}

/// One cached daily highlight, stored as `daily/<YYYY-MM-DD>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub highlight: DailyHighlight,
}
