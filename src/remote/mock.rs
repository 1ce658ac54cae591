//! Test doubles for the remote collaborators.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{RemoteError, ScriptureSource, SpeechSynthesizer};
use crate::audio::{SpeechStyle, VoiceId};
use crate::model::{Chapter, DailyHighlight, Verse};

/// A small valid chapter.
pub fn sample_chapter(book_name: &str, n: u32, verses: &[&str]) -> Chapter {
    Chapter {
        book_name: book_name.into(),
        chapter_number: n,
        verses: verses
            .iter()
            .enumerate()
            .map(|(i, t)| Verse::new(i as u32 + 1, *t))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// Replays queued chapter results in order; once the queue is empty every
/// further call returns `fallback`.
pub struct ScriptedSource {
    chapters: Mutex<VecDeque<Result<Chapter, RemoteError>>>,
    fallback: Result<Chapter, RemoteError>,
    pub reflection: Mutex<Result<String, RemoteError>>,
    pub daily: Mutex<Result<DailyHighlight, RemoteError>>,
    pub chapter_calls: AtomicUsize,
    pub reflection_calls: AtomicUsize,
    pub daily_calls: AtomicUsize,
}

impl ScriptedSource {
    /// Every chapter request succeeds with a two-verse chapter named after
    /// the request.
    pub fn ok() -> Self {
        Self::with_fallback(Err(RemoteError::EmptyResponse))
    }

    pub fn always(result: Result<Chapter, RemoteError>) -> Self {
        Self::with_fallback(result)
    }

    fn with_fallback(fallback: Result<Chapter, RemoteError>) -> Self {
        Self {
            chapters: Mutex::new(VecDeque::new()),
            fallback,
            reflection: Mutex::new(Ok("Gisik ra·ani".into())),
            daily: Mutex::new(Ok(DailyHighlight {
                verse: "Dakgipa".into(),
                reference: "John 3:16".into(),
            })),
            chapter_calls: AtomicUsize::new(0),
            reflection_calls: AtomicUsize::new(0),
            daily_calls: AtomicUsize::new(0),
        }
    }

    pub fn then(self, result: Result<Chapter, RemoteError>) -> Self {
        self.chapters.lock().unwrap().push_back(result);
        self
    }

    pub fn chapter_calls(&self) -> usize {
        self.chapter_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptureSource for ScriptedSource {
    async fn generate_chapter(&self, book_name: &str, chapter: u32) -> Result<Chapter, RemoteError> {
        self.chapter_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.chapters.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None => match &self.fallback {
                Err(RemoteError::EmptyResponse) => {
                    Ok(sample_chapter(book_name, chapter, &["Dakgipa", "Ka·saani"]))
                }
                other => other.clone(),
            },
        }
    }

    async fn generate_reflection(&self, _chapter_text: &str) -> Result<String, RemoteError> {
        self.reflection_calls.fetch_add(1, Ordering::SeqCst);
        self.reflection.lock().unwrap().clone()
    }

    async fn generate_daily_verse(&self) -> Result<DailyHighlight, RemoteError> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        self.daily.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// MockSpeech
// ---------------------------------------------------------------------------

/// Counting speech double.  Optionally gated: each call waits for one permit
/// on the returned semaphore before answering.
#[derive(Default)]
pub struct MockSpeech {
    calls: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    voices: Mutex<Vec<VoiceId>>,
    gate: Option<Arc<Semaphore>>,
}

/// Eight samples of PCM16 LE.
pub const PCM_BYTES: [u8; 16] = [0, 0, 0, 64, 0, 128, 255, 127, 0, 0, 0, 64, 0, 128, 255, 127];

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let speech = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (speech, gate)
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn heal(&self, text: &str) {
        self.failing.lock().unwrap().remove(text);
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().unwrap().get(text).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn voices(&self) -> Vec<VoiceId> {
        self.voices.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceId,
        _style: SpeechStyle,
    ) -> Result<Vec<u8>, RemoteError> {
        *self.calls.lock().unwrap().entry(text.to_string()).or_default() += 1;
        self.voices.lock().unwrap().push(voice);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.failing.lock().unwrap().contains(text) {
            return Err(RemoteError::EmptyResponse);
        }
        Ok(PCM_BYTES.to_vec())
    }
}
