//! Whole-book offline download.
//!
//! Chapters are fetched strictly in order through the [`ContentFetcher`],
//! one at a time, with a pacing delay after every chapter that actually hit
//! the remote source.  Only one download runs at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::fetcher::{ChapterSource, ContentFetcher};
use crate::model::BibleBook;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("a book download is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub book_id: String,
    pub requested: u32,
    pub succeeded: u32,
    /// Chapter numbers that could not be fetched.
    pub failed: Vec<u32>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Offline completeness of one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookProgress {
    pub cached: u32,
    pub total: u32,
    pub percent: u8,
    pub complete: bool,
}

fn percent(done: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u64 * 100) / total as u64) as u8
}

// ---------------------------------------------------------------------------
// BookDownloader
// ---------------------------------------------------------------------------

pub struct BookDownloader {
    fetcher: Arc<ContentFetcher>,
    pacing: Duration,
    running: AtomicBool,
}

/// Clears the running flag when the download ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BookDownloader {
    pub fn new(fetcher: Arc<ContentFetcher>, pacing: Duration) -> Self {
        Self {
            fetcher,
            pacing,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetch every chapter of `book`.  `on_progress(chapter, percent)` is
    /// called after each chapter, successful or not.
    ///
    /// # Errors
    ///
    /// [`DownloadError::AlreadyRunning`] if another download is in progress.
    /// Chapter failures are reported in [`DownloadReport::failed`].
    pub async fn download_book(
        &self,
        book: &BibleBook,
        mut on_progress: impl FnMut(u32, u8) + Send,
    ) -> Result<DownloadReport, DownloadError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DownloadError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        log::info!("download {}: {} chapters", book.id, book.chapters);
        let mut report = DownloadReport {
            book_id: book.id.to_string(),
            requested: book.chapters,
            succeeded: 0,
            failed: Vec::new(),
        };

        for chapter in 1..=book.chapters {
            let remote = match self.fetcher.fetch_chapter(book.id, book.name, chapter).await {
                Ok(fetched) => {
                    report.succeeded += 1;
                    fetched.source == ChapterSource::Remote
                }
                Err(e) => {
                    log::warn!("download {} {chapter} failed: {e}", book.id);
                    report.failed.push(chapter);
                    true
                }
            };

            on_progress(chapter, percent(chapter, book.chapters));

            if remote && chapter < book.chapters {
                tokio::time::sleep(self.pacing).await;
            }
        }

        log::info!(
            "download {}: {}/{} chapters, {} failed",
            book.id,
            report.succeeded,
            report.requested,
            report.failed.len()
        );
        Ok(report)
    }

    /// How much of `book` is available offline.
    pub fn book_progress(&self, book: &BibleBook) -> BookProgress {
        let cached = (self.fetcher.count_cached_chapters(book.id) as u32).min(book.chapters);
        BookProgress {
            cached,
            total: book.chapters,
            percent: percent(cached, book.chapters),
            complete: cached >= book.chapters,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
