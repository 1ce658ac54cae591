//! Playback: verse narration state machine.
//!
//! * [`PlaybackEngine`]: async command loop owning the state and session.
//! * [`PlaybackState`] / [`Target`]: the explicit state machine.
//! * [`PlaybackCommand`] / [`PlaybackEvent`]: channel vocabulary.
//! * [`ChapterSession`]: per-chapter audio cache and in-flight set.

pub mod engine;
pub mod session;
pub mod state;

pub use engine::{clamp_rate, PlaybackEngine, SUMMARY_AUDIO_ERROR, VERSE_AUDIO_ERROR};
pub use session::{AudioKey, ChapterSession};
pub use state::{PlaybackCommand, PlaybackEvent, PlaybackState, Target};
