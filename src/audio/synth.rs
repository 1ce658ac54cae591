//! `AudioSynthesizer`: text to playable audio.
//!
//! Wraps a [`SpeechSynthesizer`] and decodes its PCM16 payload.  No retry is
//! done here; the playback engine surfaces failures so the listener can
//! retry or skip.

use std::sync::Arc;

use thiserror::Error;

use super::decode::{decode_pcm16, DecodedAudio};
use super::voice::{SpeechStyle, VoiceId};
use crate::remote::{RemoteError, SpeechSynthesizer};

#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// The service answered but carried no audio.
    #[error("speech synthesis returned no audio")]
    SynthesisUnavailable,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The payload decoded to zero frames.
    #[error("audio payload decoded to nothing ({0} bytes)")]
    Decode(usize),
}

pub struct AudioSynthesizer {
    speech: Arc<dyn SpeechSynthesizer>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSynthesizer {
    pub fn new(speech: Arc<dyn SpeechSynthesizer>, sample_rate: u32, channels: u16) -> Self {
        Self {
            speech,
            sample_rate,
            channels,
        }
    }

    /// Synthesize `text` in `voice` and decode the result.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: VoiceId,
        style: SpeechStyle,
    ) -> Result<Arc<DecodedAudio>, SynthesisError> {
        let bytes = match self.speech.synthesize(text, voice, style).await {
            Ok(bytes) if bytes.is_empty() => return Err(SynthesisError::SynthesisUnavailable),
            Ok(bytes) => bytes,
            Err(RemoteError::EmptyResponse) => return Err(SynthesisError::SynthesisUnavailable),
            Err(e) => return Err(e.into()),
        };

        let audio = decode_pcm16(&bytes, self.sample_rate, self.channels);
        if audio.is_empty() {
            return Err(SynthesisError::Decode(bytes.len()));
        }

        log::debug!(
            "synthesized {} frames ({:.1}s) with voice {voice}",
            audio.frames(),
            audio.duration().as_secs_f32()
        );
        Ok(Arc::new(audio))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
