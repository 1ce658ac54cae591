//! Chapter content retrieval.
//!
//! * [`ContentFetcher`]: store-first fetch with retry and write-through,
//!   plus best-effort summary and daily-verse requests.
//! * [`RetryPolicy`]: bounded exponential backoff on transient errors.
//! * [`BookDownloader`]: paced, sequential whole-book download.

pub mod download;
pub mod fetcher;
pub mod retry;

pub use download::{BookDownloader, BookProgress, DownloadError, DownloadReport};
pub use fetcher::{
    daily_fallback, ChapterSource, ContentError, ContentFetcher, FetchedChapter,
    CONTENT_UNAVAILABLE_MESSAGE, SUMMARY_FALLBACK,
};
pub use retry::RetryPolicy;
