//! Per-chapter playback session.
//!
//! A [`ChapterSession`] owns everything that must not outlive the chapter:
//! decoded verse audio, the in-flight set, the reflection text and its
//! audio.  Creating one starts a session; dropping it cancels its token, so
//! every task spawned for it stops delivering results.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::audio::{DecodedAudio, VoiceId};
use crate::model::Chapter;

/// Verse audio is cached per voice so a voice change never replays a
/// buffer spoken by the previous narrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioKey {
    pub index: usize,
    pub voice: VoiceId,
}

pub struct ChapterSession {
    pub id: u64,
    pub chapter: Arc<Chapter>,
    pub token: CancellationToken,
    pub audio_cache: HashMap<AudioKey, Arc<DecodedAudio>>,
    /// Verse fetches currently running, at most one per key.
    pub in_flight: HashSet<AudioKey>,
    pub summary_text: Option<String>,
    pub summary_audio: HashMap<VoiceId, Arc<DecodedAudio>>,
    pub summary_in_flight: HashSet<VoiceId>,
}

impl ChapterSession {
    pub fn new(id: u64, chapter: Arc<Chapter>) -> Self {
        Self {
            id,
            chapter,
            token: CancellationToken::new(),
            audio_cache: HashMap::new(),
            in_flight: HashSet::new(),
            summary_text: None,
            summary_audio: HashMap::new(),
            summary_in_flight: HashSet::new(),
        }
    }

    pub fn verse_count(&self) -> usize {
        self.chapter.verses.len()
    }

    pub fn verse_text(&self, index: usize) -> Option<&str> {
        self.chapter.verses.get(index).map(|v| v.text.as_str())
    }

    /// Claim `key` for a new fetch.  `false` if it is cached or already
    /// being fetched.
    pub fn begin_fetch(&mut self, key: AudioKey) -> bool {
        if self.audio_cache.contains_key(&key) {
            return false;
        }
        self.in_flight.insert(key)
    }
}

impl Drop for ChapterSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
