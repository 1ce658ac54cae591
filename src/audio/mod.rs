//! Audio path: synthesized speech → PCM16 decode → output device.
//!
//! # Pipeline
//!
//! ```text
//! text → SpeechSynthesizer (PCM16 LE bytes) → decode_pcm16 → DecodedAudio
//!      → AudioSink::play → PlayingSource (rate / stop) → on_finished
//! ```

pub mod decode;
pub mod output;
pub mod synth;
pub mod voice;

pub use decode::{decode_pcm16, DecodedAudio};
pub use output::{AudioSink, CpalSink, FinishedCallback, OutputError, PlayingSource, TimedSink};
pub use synth::{AudioSynthesizer, SynthesisError};
pub use voice::{SpeechStyle, VoiceId};
