//! Playback state machine types and the engine's command/event vocabulary.

use std::sync::Arc;

use crate::audio::VoiceId;
use crate::model::Chapter;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// What is being loaded or played: one verse (0-based index into the
/// chapter's verses) or the chapter reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Verse(usize),
    Summary,
}

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// States of the playback engine.
///
/// ```text
/// Idle ──play i──▶ Loading(Verse i) ──audio ok──▶ Playing(Verse i)
///                                   ──audio err─▶ Error(Verse i)
/// Playing(Verse i) ──natural end──▶ play i+1  (Idle past the last verse)
/// Idle ──summary──▶ Loading(Summary) ──▶ Playing(Summary) ──end──▶ Idle
/// Error(Verse i) ──retry──▶ play i   ──skip──▶ play i+1
/// Error(Summary) ──retry──▶ summary
/// Error(_) ──dismiss──▶ Idle        any ──stop / navigate──▶ Idle
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading(Target),
    Playing(Target),
    /// Playback of `target` failed; `message` is user-facing.
    Error { target: Target, message: String },
}

impl PlaybackState {
    /// `true` while audio is being resolved or played.
    pub fn is_busy(&self) -> bool {
        matches!(self, PlaybackState::Loading(_) | PlaybackState::Playing(_))
    }

    pub fn target(&self) -> Option<Target> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Loading(t) | PlaybackState::Playing(t) => Some(*t),
            PlaybackState::Error { target, .. } => Some(*target),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Loading(_) => "Loading",
            PlaybackState::Playing(Target::Verse(_)) => "Playing",
            PlaybackState::Playing(Target::Summary) => "Playing reflection",
            PlaybackState::Error { .. } => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// Commands / events
// ---------------------------------------------------------------------------

/// Requests sent to the engine.
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Start a new chapter session; the previous one is torn down.
    LoadChapter(Arc<Chapter>),
    /// Tear down the current session without starting another.
    Unload,
    PlayVerse(usize),
    Toggle,
    Stop,
    PlaySummary,
    Retry,
    Skip,
    Dismiss,
    SetRate(f32),
    SetVoice(VoiceId),
}

/// Notifications published by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StateChanged(PlaybackState),
    /// Verse `i` played to its natural end.
    VerseFinished(usize),
    SummaryText(String),
    RateChanged(f32),
    VoiceChanged(VoiceId),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
