//! Persistent offline content store.
//!
//! * [`ContentStore`]: chapter cache keyed by [`ChapterKey`](crate::model::ChapterKey)
//!   plus the daily-highlight cache keyed by calendar date.
//! * [`CacheEntry`] / [`DailyEntry`]: the JSON records written to disk.
//! * [`StoreError`]: write-side failures (reads degrade to misses).

pub mod cache;
pub mod entry;

pub use cache::{ContentStore, StoreError};
pub use entry::{CacheEntry, DailyEntry};
