//! Playback engine: drives verse-by-verse narration and the reflection.
//!
//! [`PlaybackEngine`] owns the [`PlaybackState`] and the current
//! [`ChapterSession`].  It reacts to [`PlaybackCommand`]s received over a
//! `tokio::sync::mpsc` channel and publishes [`PlaybackEvent`]s.
//!
//! # Flow
//!
//! ```text
//! PlayVerse(i)
//!   └─▶ cached?  ── yes ─▶ sink.play                       [Playing(i)]
//!                ── no ──▶ spawn synthesize (or join)      [Loading(i)]
//!                            ├─ Ok  → cache, sink.play     [Playing(i)]
//!                            └─ Err →                      [Error(i)]
//!       + prefetch i+1 ..= i+lookahead
//! sink end-of-audio ─▶ VerseFinished(i), PlayVerse(i+1)     (Idle at the end)
//! ```
//!
//! Spawned work never touches engine state.  Results come back over an
//! internal channel tagged with the session id; tasks also watch the
//! session's cancellation token, so nothing from a previous chapter is ever
//! played.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::session::{AudioKey, ChapterSession};
use super::state::{PlaybackCommand, PlaybackEvent, PlaybackState, Target};
use crate::audio::{
    AudioSink, AudioSynthesizer, DecodedAudio, FinishedCallback, PlayingSource, SpeechStyle,
    SynthesisError, VoiceId,
};
use crate::config::PlaybackConfig;
use crate::content::ContentFetcher;
use crate::model::Chapter;

/// Shown when a verse cannot be voiced.
pub const VERSE_AUDIO_ERROR: &str = "Audio generate ka·na man·jaeng·a. Internet-ko nina nang·gen.";

/// Shown when the reflection cannot be voiced.
pub const SUMMARY_AUDIO_ERROR: &str = "Gisik ra·ani audio generate ka·na man·jaeng·a.";

const MIN_RATE: f32 = 0.25;
const MAX_RATE: f32 = 4.0;

fn error_message(target: Target) -> &'static str {
    match target {
        Target::Verse(_) => VERSE_AUDIO_ERROR,
        Target::Summary => SUMMARY_AUDIO_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Internal events
// ---------------------------------------------------------------------------

enum Internal {
    VerseAudio {
        session: u64,
        key: AudioKey,
        result: Result<Arc<DecodedAudio>, SynthesisError>,
    },
    SummaryReady {
        session: u64,
        voice: VoiceId,
        text: String,
        result: Result<Arc<DecodedAudio>, SynthesisError>,
    },
    SourceEnded {
        session: u64,
        source: u64,
    },
}

struct ActiveSource {
    session: u64,
    id: u64,
    target: Target,
    handle: Box<dyn PlayingSource>,
}

// ---------------------------------------------------------------------------
// PlaybackEngine
// ---------------------------------------------------------------------------

/// Create with [`PlaybackEngine::new`], then spawn [`run`](Self::run).
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use achik_bible::audio::{AudioSink, AudioSynthesizer};
/// # use achik_bible::config::PlaybackConfig;
/// # use achik_bible::content::ContentFetcher;
/// # use achik_bible::playback::{PlaybackCommand, PlaybackEngine};
/// # async fn example(fetcher: Arc<ContentFetcher>, synth: Arc<AudioSynthesizer>, sink: Arc<dyn AudioSink>) {
/// let (events_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
/// let (commands, commands_rx) = tokio::sync::mpsc::channel(16);
/// let engine = PlaybackEngine::new(fetcher, synth, sink, &PlaybackConfig::default(), events_tx);
/// tokio::spawn(engine.run(commands_rx));
///
/// commands.send(PlaybackCommand::PlayVerse(0)).await.ok();
/// while let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # }
/// ```
pub struct PlaybackEngine {
    fetcher: Arc<ContentFetcher>,
    synth: Arc<AudioSynthesizer>,
    sink: Arc<dyn AudioSink>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: Option<mpsc::UnboundedReceiver<Internal>>,

    state: PlaybackState,
    session: Option<ChapterSession>,
    next_session: u64,
    active: Option<ActiveSource>,
    next_source: u64,

    voice: VoiceId,
    rate: f32,
    lookahead: usize,
    initial_prefetch: usize,
}

impl PlaybackEngine {
    pub fn new(
        fetcher: Arc<ContentFetcher>,
        synth: Arc<AudioSynthesizer>,
        sink: Arc<dyn AudioSink>,
        settings: &PlaybackConfig,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            synth,
            sink,
            events,
            internal_tx,
            internal_rx: Some(internal_rx),
            state: PlaybackState::Idle,
            session: None,
            next_session: 0,
            active: None,
            next_source: 0,
            voice: settings.voice,
            rate: clamp_rate(settings.playback_rate).unwrap_or(1.0),
            lookahead: settings.lookahead,
            initial_prefetch: settings.initial_prefetch,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PlaybackCommand>) {
        let Some(mut internal) = self.internal_rx.take() else {
            log::error!("playback: engine already ran");
            return;
        };

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = internal.recv() => self.handle_internal(event),
            }
        }

        self.stop_active();
        self.session = None;
        log::info!("playback: command channel closed, engine shutting down");
    }

    fn handle_command(&mut self, command: PlaybackCommand) {
        log::debug!("playback: command {command:?}");
        match command {
            PlaybackCommand::LoadChapter(chapter) => self.load_chapter(chapter),
            PlaybackCommand::Unload => {
                self.stop_active();
                self.session = None;
                self.set_state(PlaybackState::Idle);
            }
            PlaybackCommand::PlayVerse(index) => self.start_verse(index),
            PlaybackCommand::Toggle => self.toggle(),
            PlaybackCommand::Stop => {
                self.stop_active();
                self.set_state(PlaybackState::Idle);
            }
            PlaybackCommand::PlaySummary => self.start_summary(),
            PlaybackCommand::Retry => self.retry(),
            PlaybackCommand::Skip => self.skip(),
            PlaybackCommand::Dismiss => {
                if matches!(self.state, PlaybackState::Error { .. }) {
                    self.set_state(PlaybackState::Idle);
                }
            }
            PlaybackCommand::SetRate(rate) => self.set_rate(rate),
            PlaybackCommand::SetVoice(voice) => self.set_voice(voice),
        }
    }

    fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::VerseAudio {
                session,
                key,
                result,
            } => self.on_verse_audio(session, key, result),
            Internal::SummaryReady {
                session,
                voice,
                text,
                result,
            } => self.on_summary_ready(session, voice, text, result),
            Internal::SourceEnded { session, source } => self.on_source_ended(session, source),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&mut self, next: PlaybackState) {
        if self.state != next {
            log::debug!("playback: {:?} → {:?}", self.state, next);
            self.state = next.clone();
            self.emit(PlaybackEvent::StateChanged(next));
        }
    }

    fn is_current(&self, session: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session)
    }

    /// Stop the active source without triggering its end-of-audio chain.
    fn stop_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.handle.stop();
        }
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    fn load_chapter(&mut self, chapter: Arc<Chapter>) {
        self.stop_active();
        self.next_session += 1;
        log::info!(
            "playback: session {} for {} {} ({} verses)",
            self.next_session,
            chapter.book_name,
            chapter.chapter_number,
            chapter.verses.len()
        );
        // Replacing the session drops the old one, cancelling its tasks.
        self.session = Some(ChapterSession::new(self.next_session, chapter));
        self.set_state(PlaybackState::Idle);

        for index in 0..self.initial_prefetch {
            self.request_verse(index);
        }
    }

    // -----------------------------------------------------------------------
    // Verses
    // -----------------------------------------------------------------------

    /// Start synthesis of verse `index` in the current voice unless it is
    /// cached, already in flight or out of range.
    fn request_verse(&mut self, index: usize) {
        let voice = self.voice;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(text) = session.verse_text(index).map(str::to_owned) else {
            return;
        };
        let key = AudioKey { index, voice };
        if !session.begin_fetch(key) {
            return;
        }

        let session_id = session.id;
        let token = session.token.clone();
        let synth = Arc::clone(&self.synth);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = synth.synthesize(&text, voice, SpeechStyle::Verse) => result,
            };
            if !token.is_cancelled() {
                let _ = tx.send(Internal::VerseAudio {
                    session: session_id,
                    key,
                    result,
                });
            }
        });
    }

    fn start_verse(&mut self, index: usize) {
        self.stop_active();
        let voice = self.voice;
        let Some(session) = self.session.as_ref() else {
            log::warn!("playback: no chapter loaded");
            return;
        };
        if index >= session.verse_count() {
            self.set_state(PlaybackState::Idle);
            return;
        }

        let cached = session.audio_cache.get(&AudioKey { index, voice }).cloned();
        match cached {
            Some(audio) => self.play_buffer(Target::Verse(index), audio),
            None => {
                self.set_state(PlaybackState::Loading(Target::Verse(index)));
                self.request_verse(index);
            }
        }

        for ahead in index + 1..=index + self.lookahead {
            self.request_verse(ahead);
        }
    }

    fn on_verse_audio(
        &mut self,
        session_id: u64,
        key: AudioKey,
        result: Result<Arc<DecodedAudio>, SynthesisError>,
    ) {
        if !self.is_current(session_id) {
            log::debug!("playback: dropping stale audio for verse {}", key.index);
            return;
        }
        let waiting =
            self.state == PlaybackState::Loading(Target::Verse(key.index)) && key.voice == self.voice;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.in_flight.remove(&key);

        match result {
            Ok(audio) => {
                session.audio_cache.insert(key, Arc::clone(&audio));
                if waiting {
                    self.play_buffer(Target::Verse(key.index), audio);
                }
            }
            Err(e) if waiting => {
                log::warn!("playback: verse {} audio failed: {e}", key.index);
                self.set_state(PlaybackState::Error {
                    target: Target::Verse(key.index),
                    message: VERSE_AUDIO_ERROR.into(),
                });
            }
            Err(e) => log::warn!("playback: prefetch of verse {} failed: {e}", key.index),
        }
    }

    // -----------------------------------------------------------------------
    // Summary
    // -----------------------------------------------------------------------

    fn start_summary(&mut self) {
        self.stop_active();
        let voice = self.voice;
        let Some(session) = self.session.as_mut() else {
            log::warn!("playback: no chapter loaded");
            return;
        };

        let cached_text = session.summary_text.clone();
        let cached_audio = session.summary_audio.get(&voice).cloned();
        let start_fetch = cached_audio.is_none() && session.summary_in_flight.insert(voice);
        let chapter = Arc::clone(&session.chapter);
        let session_id = session.id;
        let token = session.token.clone();

        if let Some(text) = &cached_text {
            self.emit(PlaybackEvent::SummaryText(text.clone()));
        }
        if let Some(audio) = cached_audio {
            self.play_buffer(Target::Summary, audio);
            return;
        }
        self.set_state(PlaybackState::Loading(Target::Summary));
        if !start_fetch {
            return;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let synth = Arc::clone(&self.synth);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let work = async move {
                let text = match cached_text {
                    Some(text) => text,
                    None => fetcher.fetch_summary(&chapter).await,
                };
                let result = synth.synthesize(&text, voice, SpeechStyle::Summary).await;
                (text, result)
            };
            let (text, result) = tokio::select! {
                _ = token.cancelled() => return,
                out = work => out,
            };
            if !token.is_cancelled() {
                let _ = tx.send(Internal::SummaryReady {
                    session: session_id,
                    voice,
                    text,
                    result,
                });
            }
        });
    }

    fn on_summary_ready(
        &mut self,
        session_id: u64,
        voice: VoiceId,
        text: String,
        result: Result<Arc<DecodedAudio>, SynthesisError>,
    ) {
        if !self.is_current(session_id) {
            log::debug!("playback: dropping stale reflection");
            return;
        }
        let waiting = self.state == PlaybackState::Loading(Target::Summary) && voice == self.voice;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.summary_in_flight.remove(&voice);
        let fresh_text = session.summary_text.is_none();
        if fresh_text {
            session.summary_text = Some(text.clone());
        }
        if let Ok(audio) = &result {
            session.summary_audio.insert(voice, Arc::clone(audio));
        }

        if fresh_text {
            self.emit(PlaybackEvent::SummaryText(text));
        }
        match result {
            Ok(audio) if waiting => self.play_buffer(Target::Summary, audio),
            Ok(_) => {}
            Err(e) if waiting => {
                log::warn!("playback: reflection audio failed: {e}");
                self.set_state(PlaybackState::Error {
                    target: Target::Summary,
                    message: SUMMARY_AUDIO_ERROR.into(),
                });
            }
            Err(e) => log::warn!("playback: reflection audio failed after it was abandoned: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    fn play_buffer(&mut self, target: Target, audio: Arc<DecodedAudio>) {
        let Some(session_id) = self.session.as_ref().map(|s| s.id) else {
            return;
        };
        self.next_source += 1;
        let source_id = self.next_source;

        let tx = self.internal_tx.clone();
        let on_finished: FinishedCallback = Box::new(move || {
            let _ = tx.send(Internal::SourceEnded {
                session: session_id,
                source: source_id,
            });
        });

        match self.sink.play(audio, self.rate, on_finished) {
            Ok(handle) => {
                self.active = Some(ActiveSource {
                    session: session_id,
                    id: source_id,
                    target,
                    handle,
                });
                self.set_state(PlaybackState::Playing(target));
            }
            Err(e) => {
                log::error!("playback: audio output failed: {e}");
                self.set_state(PlaybackState::Error {
                    target,
                    message: error_message(target).into(),
                });
            }
        }
    }

    fn on_source_ended(&mut self, session_id: u64, source_id: u64) {
        let ours = self
            .active
            .as_ref()
            .is_some_and(|a| a.id == source_id && a.session == session_id);
        if !ours {
            return;
        }
        let Some(active) = self.active.take() else {
            return;
        };
        let target = active.target;
        drop(active);

        match target {
            Target::Verse(index) => {
                self.emit(PlaybackEvent::VerseFinished(index));
                self.start_verse(index + 1);
            }
            Target::Summary => self.set_state(PlaybackState::Idle),
        }
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing(Target::Verse(_)) | PlaybackState::Loading(Target::Verse(_)) => {
                self.stop_active();
                self.set_state(PlaybackState::Idle);
            }
            PlaybackState::Error {
                target: Target::Verse(index),
                ..
            } => self.start_verse(index),
            _ => self.start_verse(0),
        }
    }

    fn retry(&mut self) {
        match self.state {
            PlaybackState::Error {
                target: Target::Verse(index),
                ..
            } => self.start_verse(index),
            PlaybackState::Error {
                target: Target::Summary,
                ..
            } => self.start_summary(),
            _ => log::debug!("playback: nothing to retry"),
        }
    }

    fn skip(&mut self) {
        match self.state {
            PlaybackState::Error {
                target: Target::Verse(index),
                ..
            } => self.start_verse(index + 1),
            PlaybackState::Error {
                target: Target::Summary,
                ..
            } => log::warn!("playback: a reflection error can only be retried or dismissed"),
            _ => log::debug!("playback: nothing to skip"),
        }
    }

    fn set_rate(&mut self, rate: f32) {
        let Some(rate) = clamp_rate(rate) else {
            log::warn!("playback: ignoring invalid rate {rate}");
            return;
        };
        self.rate = rate;
        if let Some(active) = &self.active {
            active.handle.set_rate(rate);
        }
        self.emit(PlaybackEvent::RateChanged(rate));
    }

    fn set_voice(&mut self, voice: VoiceId) {
        if voice == self.voice {
            return;
        }
        log::info!("playback: voice {} → {}", self.voice, voice);
        self.voice = voice;
        self.emit(PlaybackEvent::VoiceChanged(voice));
        if self.state.is_busy() {
            self.stop_active();
            self.set_state(PlaybackState::Idle);
        }
    }
}

/// The rate the engine actually applies: clamped to `[0.25, 4.0]`, or
/// `None` for non-finite and non-positive values.
pub fn clamp_rate(rate: f32) -> Option<f32> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    Some(rate.clamp(MIN_RATE, MAX_RATE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::testing::TestSink;
    use crate::content::RetryPolicy;
    use crate::remote::mock::{sample_chapter, MockSpeech, ScriptedSource};
    use crate::store::ContentStore;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::playback::state::PlaybackCommand::*;

    struct Harness {
        commands: mpsc::Sender<PlaybackCommand>,
        events: mpsc::UnboundedReceiver<PlaybackEvent>,
        speech: Arc<MockSpeech>,
        source: Arc<ScriptedSource>,
        sink: TestSink,
        _dir: TempDir,
    }

    fn harness(speech: MockSpeech, sink: TestSink) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ContentStore::open(dir.path()));
        let source = Arc::new(ScriptedSource::ok());
        let fetcher = Arc::new(ContentFetcher::new(store, source.clone(), RetryPolicy::default()));
        let speech = Arc::new(speech);
        let synth = Arc::new(AudioSynthesizer::new(speech.clone(), 24_000, 1));

        let (events_tx, events) = mpsc::unbounded_channel();
        let engine = PlaybackEngine::new(
            fetcher,
            synth,
            Arc::new(sink.clone()),
            &PlaybackConfig::default(),
            events_tx,
        );
        let (commands, commands_rx) = mpsc::channel(16);
        tokio::spawn(engine.run(commands_rx));

        Harness {
            commands,
            events,
            speech,
            source,
            sink,
            _dir: dir,
        }
    }

    impl Harness {
        async fn send(&self, command: PlaybackCommand) {
            self.commands.send(command).await.unwrap();
        }

        async fn load(&self, verses: &[&str]) {
            self.send(LoadChapter(Arc::new(sample_chapter("Genesis", 1, verses))))
                .await;
        }

        async fn next_event(&mut self) -> PlaybackEvent {
            tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("timed out waiting for a playback event")
                .expect("engine stopped")
        }

        /// Events up to and including the first one matching `done`.
        async fn until(&mut self, done: impl Fn(&PlaybackEvent) -> bool) -> Vec<PlaybackEvent> {
            let mut seen = Vec::new();
            loop {
                let event = self.next_event().await;
                let stop = done(&event);
                seen.push(event);
                if stop {
                    return seen;
                }
            }
        }

        async fn until_state(&mut self, state: PlaybackState) -> Vec<PlaybackEvent> {
            self.until(|e| *e == PlaybackEvent::StateChanged(state.clone()))
                .await
        }
    }

    fn finished(events: &[PlaybackEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::VerseFinished(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    fn playing(index: usize) -> PlaybackState {
        PlaybackState::Playing(Target::Verse(index))
    }

    fn verse_error(index: usize) -> PlaybackState {
        PlaybackState::Error {
            target: Target::Verse(index),
            message: VERSE_AUDIO_ERROR.into(),
        }
    }

    // ---- chaining ---

    #[tokio::test]
    async fn verses_chain_to_the_end_of_the_chapter() {
        let mut h = harness(MockSpeech::new(), TestSink::auto());
        h.load(&["a", "b", "c"]).await;
        h.send(PlayVerse(0)).await;

        let events = h.until_state(PlaybackState::Idle).await;
        assert_eq!(finished(&events), vec![0, 1, 2]);
        assert_eq!(h.sink.plays(), 3);
    }

    #[tokio::test]
    async fn two_verse_chapter_plays_both_then_idles() {
        let mut h = harness(MockSpeech::new(), TestSink::auto());
        h.load(&["Dakgipa", "Ka·saani"]).await;
        h.send(PlayVerse(0)).await;

        let events = h.until_state(PlaybackState::Idle).await;
        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::StateChanged(s @ PlaybackState::Playing(_)) => Some(s.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![playing(0), playing(1)]);
        assert_eq!(finished(&events), vec![0, 1]);
    }

    // ---- prefetch ---

    #[tokio::test]
    async fn foreground_request_joins_in_flight_prefetch() {
        let (speech, gate) = MockSpeech::gated();
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a", "b", "c"]).await;
        h.send(PlayVerse(0)).await;
        h.until_state(PlaybackState::Loading(Target::Verse(0))).await;

        gate.add_permits(16);
        h.until_state(playing(0)).await;

        assert_eq!(h.speech.calls_for("a"), 1);
        assert_eq!(h.speech.calls_for("b"), 1);
        assert_eq!(h.speech.calls_for("c"), 1);
    }

    #[tokio::test]
    async fn stale_audio_never_plays_after_navigation() {
        let (speech, gate) = MockSpeech::gated();
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a1", "a2"]).await;
        h.send(PlayVerse(0)).await;
        h.until_state(PlaybackState::Loading(Target::Verse(0))).await;

        h.load(&["b1", "b2"]).await;
        h.until_state(PlaybackState::Idle).await;
        gate.add_permits(16);

        h.send(PlayVerse(1)).await;
        let events = h.until_state(playing(1)).await;
        assert!(!events.contains(&PlaybackEvent::StateChanged(playing(0))));
        assert_eq!(h.sink.plays(), 1);
        assert_eq!(h.speech.calls_for("b2"), 1);
    }

    // ---- errors ---

    #[tokio::test]
    async fn skip_after_verse_error_continues_with_next_verse() {
        let speech = MockSpeech::new();
        speech.fail_on("Ka·saani");
        let mut h = harness(speech, TestSink::auto());
        h.load(&["Dakgipa", "Ka·saani", "Nama"]).await;
        h.send(PlayVerse(0)).await;

        let events = h.until_state(verse_error(1)).await;
        assert_eq!(finished(&events), vec![0]);

        h.send(Skip).await;
        let events = h.until_state(PlaybackState::Idle).await;
        assert!(events.contains(&PlaybackEvent::StateChanged(playing(2))));
        assert_eq!(finished(&events), vec![2]);
    }

    #[tokio::test]
    async fn skip_past_last_verse_goes_idle() {
        let speech = MockSpeech::new();
        speech.fail_on("Ka·saani");
        let mut h = harness(speech, TestSink::manual());
        h.load(&["Dakgipa", "Ka·saani"]).await;
        h.send(PlayVerse(1)).await;
        h.until_state(verse_error(1)).await;

        h.send(Skip).await;
        h.until_state(PlaybackState::Idle).await;
        assert_eq!(h.sink.plays(), 0);
    }

    #[tokio::test]
    async fn retry_resynthesizes_failed_verse() {
        let speech = MockSpeech::new();
        speech.fail_on("b");
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a", "b"]).await;
        h.send(PlayVerse(1)).await;
        h.until_state(verse_error(1)).await;

        h.speech.heal("b");
        h.send(Retry).await;
        h.until_state(playing(1)).await;
        assert!(h.speech.calls_for("b") >= 2);
    }

    // ---- transport ---

    #[tokio::test]
    async fn toggle_starts_then_stops() {
        let mut h = harness(MockSpeech::new(), TestSink::manual());
        h.load(&["a", "b"]).await;

        h.send(Toggle).await;
        h.until_state(playing(0)).await;
        assert!(h.sink.is_playing());

        h.send(Toggle).await;
        let events = h.until_state(PlaybackState::Idle).await;
        assert!(finished(&events).is_empty());
        assert_eq!(h.sink.stops(), 1);
        assert!(!h.sink.is_playing());
    }

    #[tokio::test]
    async fn rate_applies_to_active_and_later_verses() {
        let mut h = harness(MockSpeech::new(), TestSink::manual());
        h.load(&["a", "b"]).await;
        h.send(PlayVerse(0)).await;
        h.until_state(playing(0)).await;

        h.send(SetRate(1.5)).await;
        h.until(|e| *e == PlaybackEvent::RateChanged(1.5)).await;
        assert_eq!(h.sink.rates(), vec![1.0, 1.5]);

        assert!(h.sink.finish_current());
        h.until_state(playing(1)).await;
        assert_eq!(h.sink.rates().last(), Some(&1.5));

        h.send(SetRate(10.0)).await;
        h.until(|e| *e == PlaybackEvent::RateChanged(MAX_RATE)).await;
    }

    #[tokio::test]
    async fn voice_change_stops_playback_and_resynthesizes() {
        let mut h = harness(MockSpeech::new(), TestSink::manual());
        h.load(&["a", "b"]).await;
        h.send(PlayVerse(0)).await;
        h.until_state(playing(0)).await;

        h.send(SetVoice(VoiceId::Kore)).await;
        let events = h.until_state(PlaybackState::Idle).await;
        assert!(events.contains(&PlaybackEvent::VoiceChanged(VoiceId::Kore)));
        assert_eq!(h.sink.stops(), 1);

        h.send(PlayVerse(0)).await;
        h.until_state(playing(0)).await;
        assert_eq!(h.speech.calls_for("a"), 2);
        assert!(h.speech.voices().contains(&VoiceId::Kore));
    }

    #[tokio::test]
    async fn unload_stops_and_idles() {
        let mut h = harness(MockSpeech::new(), TestSink::manual());
        h.load(&["a"]).await;
        h.send(PlayVerse(0)).await;
        h.until_state(playing(0)).await;

        h.send(Unload).await;
        h.until_state(PlaybackState::Idle).await;
        assert_eq!(h.sink.stops(), 1);
    }

    // ---- summary ---

    #[tokio::test]
    async fn summary_plays_once_and_is_cached_for_the_session() {
        let mut h = harness(MockSpeech::new(), TestSink::auto());
        h.load(&["a"]).await;

        h.send(PlaySummary).await;
        let events = h.until_state(PlaybackState::Idle).await;
        assert!(events.contains(&PlaybackEvent::SummaryText("Gisik ra·ani".into())));
        assert!(events.contains(&PlaybackEvent::StateChanged(PlaybackState::Playing(
            Target::Summary
        ))));
        assert!(finished(&events).is_empty());

        h.send(PlaySummary).await;
        let events = h.until_state(PlaybackState::Idle).await;
        assert!(events.contains(&PlaybackEvent::SummaryText("Gisik ra·ani".into())));
        assert_eq!(h.source.reflection_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.speech.calls_for("Gisik ra·ani"), 1);
    }

    #[tokio::test]
    async fn summary_error_cannot_be_skipped_only_dismissed() {
        let speech = MockSpeech::new();
        speech.fail_on("Gisik ra·ani");
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a"]).await;

        h.send(PlaySummary).await;
        h.until_state(PlaybackState::Error {
            target: Target::Summary,
            message: SUMMARY_AUDIO_ERROR.into(),
        })
        .await;

        h.send(Skip).await;
        h.send(Dismiss).await;
        assert_eq!(
            h.next_event().await,
            PlaybackEvent::StateChanged(PlaybackState::Idle)
        );
    }

    #[tokio::test]
    async fn stale_reflection_never_plays_after_navigation() {
        let (speech, gate) = MockSpeech::gated();
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a"]).await;
        h.send(PlaySummary).await;
        h.until_state(PlaybackState::Loading(Target::Summary)).await;

        h.load(&["b"]).await;
        h.until_state(PlaybackState::Idle).await;
        gate.add_permits(16);

        h.send(PlayVerse(0)).await;
        let events = h.until_state(playing(0)).await;
        assert!(!events.contains(&PlaybackEvent::StateChanged(PlaybackState::Playing(
            Target::Summary
        ))));
        assert_eq!(h.sink.plays(), 1);
    }

    #[tokio::test]
    async fn late_reflection_does_not_take_over_verse_playback() {
        let (speech, gate) = MockSpeech::gated();
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a", "b"]).await;
        h.send(PlaySummary).await;
        h.until_state(PlaybackState::Loading(Target::Summary)).await;

        h.send(PlayVerse(0)).await;
        h.until_state(PlaybackState::Loading(Target::Verse(0))).await;
        gate.add_permits(16);

        // The reflection result is announced by its text; wait for both.
        let mut events = Vec::new();
        while !(events.contains(&PlaybackEvent::StateChanged(playing(0)))
            && events.iter().any(|e| matches!(e, PlaybackEvent::SummaryText(_))))
        {
            events.push(h.next_event().await);
        }

        assert!(!events.contains(&PlaybackEvent::StateChanged(PlaybackState::Playing(
            Target::Summary
        ))));
        assert_eq!(h.sink.plays(), 1);
        assert!(h.sink.is_playing());
    }

    #[tokio::test]
    async fn retry_after_reflection_error_resynthesizes_and_plays() {
        let speech = MockSpeech::new();
        speech.fail_on("Gisik ra·ani");
        let mut h = harness(speech, TestSink::manual());
        h.load(&["a"]).await;

        h.send(PlaySummary).await;
        h.until_state(PlaybackState::Error {
            target: Target::Summary,
            message: SUMMARY_AUDIO_ERROR.into(),
        })
        .await;

        h.speech.heal("Gisik ra·ani");
        h.send(Retry).await;
        h.until_state(PlaybackState::Playing(Target::Summary)).await;

        assert_eq!(h.speech.calls_for("Gisik ra·ani"), 2);
        assert_eq!(h.source.reflection_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.sink.plays(), 1);
    }

    #[test]
    fn rate_is_clamped() {
        assert_eq!(clamp_rate(0.1), Some(MIN_RATE));
        assert_eq!(clamp_rate(1.25), Some(1.25));
        assert_eq!(clamp_rate(f32::NAN), None);
        assert_eq!(clamp_rate(-1.0), None);
    }
}
