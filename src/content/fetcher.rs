//! `ContentFetcher`: store-first chapter retrieval with write-through.
//!
//! ```text
//! fetch_chapter ─► ContentStore::get ──hit──► Chapter (Cache)
//!                        │ miss
//!                        ▼
//!             RetryPolicy::run(ScriptureSource::generate_chapter)
//!                        │ ok: normalise, ContentStore::put
//!                        ▼
//!                     Chapter (Remote)
//! ```
//!
//! Summary and daily-verse requests are best-effort: any failure returns a
//! fixed fallback value and is only logged.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use super::retry::RetryPolicy;
use crate::model::{Chapter, ChapterKey, DailyHighlight};
use crate::remote::{RemoteError, ScriptureSource};
use crate::store::ContentStore;

/// Shown when a chapter cannot be fetched.
pub const CONTENT_UNAVAILABLE_MESSAGE: &str =
    "Batmonge: Katta am·ani chu·sokja. Internet-ko nina nang·gen.";

/// Returned when the reflection cannot be generated.
pub const SUMMARY_FALLBACK: &str = "Reflection generate ka·na man·jaeng·a.";

const DAILY_FALLBACK_VERSE: &str = "Isol saksan Dakgipa aro Ka·saani bitchi ong·a.";
const DAILY_FALLBACK_REFERENCE: &str = "Genesis 1:1";

pub fn daily_fallback() -> DailyHighlight {
    DailyHighlight {
        verse: DAILY_FALLBACK_VERSE.into(),
        reference: DAILY_FALLBACK_REFERENCE.into(),
    }
}

// ---------------------------------------------------------------------------
// ContentError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ContentError {
    /// Retries exhausted or a permanent failure.  `message` is user-facing.
    #[error("{message}")]
    ContentUnavailable { message: String, source: RemoteError },
}

impl ContentError {
    fn unavailable(source: RemoteError) -> Self {
        ContentError::ContentUnavailable {
            message: CONTENT_UNAVAILABLE_MESSAGE.into(),
            source,
        }
    }

    pub fn user_message(&self) -> &str {
        match self {
            ContentError::ContentUnavailable { message, .. } => message,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchedChapter
// ---------------------------------------------------------------------------

/// Where a fetched chapter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterSource {
    Cache,
    Remote,
}

#[derive(Debug, Clone)]
pub struct FetchedChapter {
    pub chapter: Chapter,
    pub source: ChapterSource,
}

// ---------------------------------------------------------------------------
// ContentFetcher
// ---------------------------------------------------------------------------

pub struct ContentFetcher {
    store: Arc<ContentStore>,
    source: Arc<dyn ScriptureSource>,
    retry: RetryPolicy,
}

impl ContentFetcher {
    pub fn new(store: Arc<ContentStore>, source: Arc<dyn ScriptureSource>, retry: RetryPolicy) -> Self {
        Self {
            store,
            source,
            retry,
        }
    }

    /// Return chapter `chapter` of `book_id`, from the store when cached,
    /// otherwise from the remote source (retried, validated and written
    /// through to the store before returning).
    ///
    /// # Errors
    ///
    /// [`ContentError::ContentUnavailable`] once retries are exhausted or on
    /// the first permanent failure.
    pub async fn fetch_chapter(
        &self,
        book_id: &str,
        book_name: &str,
        chapter: u32,
    ) -> Result<FetchedChapter, ContentError> {
        let key = ChapterKey::new(book_id, chapter);

        if let Some(cached) = self.store.get(&key).await {
            log::debug!("fetch {key}: store hit");
            return Ok(FetchedChapter {
                chapter: cached,
                source: ChapterSource::Cache,
            });
        }

        log::info!("fetch {key}: requesting {book_name} {chapter}");
        let source = self.source.as_ref();
        let fetched = self
            .retry
            .run(move || async move {
                let raw = source.generate_chapter(book_name, chapter).await?;
                raw.normalized()
                    .map_err(|e| RemoteError::Schema(e.to_string()))
            })
            .await
            .map_err(ContentError::unavailable)?;

        // A failed write only costs a future re-fetch.
        let _ = self.store.put(&key, &fetched).await;

        Ok(FetchedChapter {
            chapter: fetched,
            source: ChapterSource::Remote,
        })
    }

    pub fn is_chapter_cached(&self, book_id: &str, chapter: u32) -> bool {
        self.store.is_cached(&ChapterKey::new(book_id, chapter))
    }

    pub fn count_cached_chapters(&self, book_id: &str) -> usize {
        self.store.count_cached_chapters(book_id)
    }

    /// Reflection text for `chapter`; never fails.
    pub async fn fetch_summary(&self, chapter: &Chapter) -> String {
        match self.source.generate_reflection(&chapter.numbered_text()).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "reflection for {} {} failed, using fallback: {e}",
                    chapter.book_name,
                    chapter.chapter_number
                );
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    /// Verse of the day for the local calendar date; never fails.
    pub async fn fetch_daily_highlight(&self) -> DailyHighlight {
        self.fetch_daily_highlight_on(chrono::Local::now().date_naive())
            .await
    }

    /// Verse of the day for `date`: the stored one if present, otherwise a
    /// fresh one (stored on success) or the fixed fallback.
    pub async fn fetch_daily_highlight_on(&self, date: NaiveDate) -> DailyHighlight {
        if let Some(cached) = self.store.get_daily(date).await {
            return cached;
        }

        match self.source.generate_daily_verse().await {
            Ok(highlight) => {
                let _ = self.store.put_daily(date, &highlight).await;
                highlight
            }
            Err(e) => {
                log::warn!("daily verse failed, using fallback: {e}");
                daily_fallback()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
