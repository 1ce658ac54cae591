//! Remote generation collaborators.
//!
//! This module provides:
//! * [`ScriptureSource`]: async trait for chapter text, chapter reflections
//!   and the daily verse.
//! * [`SpeechSynthesizer`]: async trait turning text into raw PCM16 bytes.
//! * [`GeminiClient`]: `generateContent` REST implementation of both.
//! * [`RemoteError`]: error variants, classified by
//!   [`is_transient`](RemoteError::is_transient).
//!
//! Neither trait retries; retry policy belongs to the caller.

pub mod error;
pub mod gemini;
pub mod prompt;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::audio::{SpeechStyle, VoiceId};
use crate::model::{Chapter, DailyHighlight};

pub use error::RemoteError;
pub use gemini::GeminiClient;

// ---------------------------------------------------------------------------
// ScriptureSource
// ---------------------------------------------------------------------------

/// Text-generation collaborator.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn ScriptureSource>`.
#[async_trait]
pub trait ScriptureSource: Send + Sync {
    /// Full chapter text.  A response that does not fit the chapter shape is
    /// a [`RemoteError::Schema`] error.
    async fn generate_chapter(&self, book_name: &str, chapter: u32) -> Result<Chapter, RemoteError>;

    /// A reflective summary of `chapter_text`.
    async fn generate_reflection(&self, chapter_text: &str) -> Result<String, RemoteError>;

    /// One encouraging verse with its reference.
    async fn generate_daily_verse(&self) -> Result<DailyHighlight, RemoteError>;
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer
// ---------------------------------------------------------------------------

/// Speech collaborator.  Returns encoded audio: signed 16-bit little-endian
/// PCM, 24 kHz mono.  A response without an audio payload is
/// [`RemoteError::EmptyResponse`].
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceId,
        style: SpeechStyle,
    ) -> Result<Vec<u8>, RemoteError>;
}
