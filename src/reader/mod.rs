//! Reading session controller.
//!
//! [`Reader`] tracks which chapter is open, fetches it through the
//! [`ContentFetcher`] and hands it to the playback engine.  Every
//! navigation unloads the engine before the fetch starts.  A failed fetch
//! surfaces [`ReaderError::Content`] so the caller can offer
//! [`reload`](Reader::reload).

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::content::{BookDownloader, BookProgress, ContentError, ContentFetcher, FetchedChapter};
use crate::model::{find_book, next_chapter, prev_chapter, BibleBook, Chapter, DailyHighlight};
use crate::playback::PlaybackCommand;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("unknown book: {0}")]
    UnknownBook(String),

    #[error("{book} has {chapters} chapters")]
    ChapterOutOfRange { book: &'static str, chapters: u32 },

    #[error("no chapter is open")]
    NothingOpen,

    #[error("already at the {0} of the Bible")]
    EndOfCanon(&'static str),

    #[error("playback engine has stopped")]
    EngineGone,

    #[error(transparent)]
    Content(#[from] ContentError),
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

pub struct Reader {
    fetcher: Arc<ContentFetcher>,
    downloader: Arc<BookDownloader>,
    playback: mpsc::Sender<PlaybackCommand>,
    position: Option<(&'static BibleBook, u32)>,
    current: Option<Arc<Chapter>>,
}

impl Reader {
    pub fn new(
        fetcher: Arc<ContentFetcher>,
        downloader: Arc<BookDownloader>,
        playback: mpsc::Sender<PlaybackCommand>,
    ) -> Self {
        Self {
            fetcher,
            downloader,
            playback,
            position: None,
            current: None,
        }
    }

    /// Last requested book and chapter, whether or not it loaded.
    pub fn position(&self) -> Option<(&'static BibleBook, u32)> {
        self.position
    }

    pub fn current(&self) -> Option<&Arc<Chapter>> {
        self.current.as_ref()
    }

    pub fn downloader(&self) -> Arc<BookDownloader> {
        Arc::clone(&self.downloader)
    }

    /// Open `chapter` of the book named or identified by `query`.
    pub async fn open(&mut self, query: &str, chapter: u32) -> Result<FetchedChapter, ReaderError> {
        let book = lookup(query)?;
        if chapter == 0 || chapter > book.chapters {
            return Err(ReaderError::ChapterOutOfRange {
                book: book.name,
                chapters: book.chapters,
            });
        }
        self.open_at(book, chapter).await
    }

    /// Re-attempt the last requested chapter.
    pub async fn reload(&mut self) -> Result<FetchedChapter, ReaderError> {
        let (book, chapter) = self.position.ok_or(ReaderError::NothingOpen)?;
        self.open_at(book, chapter).await
    }

    pub async fn next(&mut self) -> Result<FetchedChapter, ReaderError> {
        let (book, chapter) = self.position.ok_or(ReaderError::NothingOpen)?;
        let (book, chapter) = next_chapter(book, chapter).ok_or(ReaderError::EndOfCanon("end"))?;
        self.open_at(book, chapter).await
    }

    pub async fn prev(&mut self) -> Result<FetchedChapter, ReaderError> {
        let (book, chapter) = self.position.ok_or(ReaderError::NothingOpen)?;
        let (book, chapter) =
            prev_chapter(book, chapter).ok_or(ReaderError::EndOfCanon("beginning"))?;
        self.open_at(book, chapter).await
    }

    async fn open_at(
        &mut self,
        book: &'static BibleBook,
        chapter: u32,
    ) -> Result<FetchedChapter, ReaderError> {
        // The old session must be gone before the fetch, which can take
        // several seconds of retries.
        self.position = Some((book, chapter));
        self.current = None;
        self.command(PlaybackCommand::Unload).await?;

        match self.fetcher.fetch_chapter(book.id, book.name, chapter).await {
            Ok(fetched) => {
                let shared = Arc::new(fetched.chapter.clone());
                self.current = Some(Arc::clone(&shared));
                self.command(PlaybackCommand::LoadChapter(shared)).await?;
                Ok(fetched)
            }
            Err(e) => {
                log::warn!("reader: {} {chapter} unavailable: {e}", book.id);
                Err(e.into())
            }
        }
    }

    /// Forward a transport command to the playback engine.
    pub async fn command(&self, command: PlaybackCommand) -> Result<(), ReaderError> {
        self.playback
            .send(command)
            .await
            .map_err(|_| ReaderError::EngineGone)
    }

    pub fn book_progress(&self, query: &str) -> Result<BookProgress, ReaderError> {
        Ok(self.downloader.book_progress(lookup(query)?))
    }

    pub async fn daily_highlight(&self) -> DailyHighlight {
        self.fetcher.fetch_daily_highlight().await
    }
}

pub fn lookup(query: &str) -> Result<&'static BibleBook, ReaderError> {
    find_book(query).ok_or_else(|| ReaderError::UnknownBook(query.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
