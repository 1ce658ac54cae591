//! Data model: chapter content, cache keys and the book catalog.

pub mod books;
pub mod chapter;

pub use books::{find_book, next_chapter, prev_chapter, BibleBook, Testament, BOOKS};
pub use chapter::{Chapter, ChapterError, ChapterKey, DailyHighlight, Verse};
