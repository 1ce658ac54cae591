//! PCM16 decoding.
//!
//! The speech service returns headerless signed 16-bit little-endian PCM.
//! [`decode_pcm16`] turns those bytes into per-channel `f32` buffers in
//! `[-1.0, 1.0)` ready for playback.

use std::time::Duration;

/// Decoded, playable audio.  `channels[c][i]` is frame `i` of channel `c`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Playback length at rate 1.0.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Sample at `frame` for output channel `channel`; mono audio is shared
    /// across every output channel.
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        if self.channels.is_empty() {
            return 0.0;
        }
        let ch = &self.channels[channel % self.channels.len()];
        ch.get(frame).copied().unwrap_or(0.0)
    }
}

/// Decode interleaved PCM16 LE into a [`DecodedAudio`].
///
/// Each sample is divided by 32768.  A trailing partial frame (odd byte or
/// incomplete channel group) is ignored.  `channels == 0` is treated as mono.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> DecodedAudio {
    let channel_count = channels.max(1) as usize;
    let frame_bytes = 2 * channel_count;
    let frames = bytes.len() / frame_bytes;

    let mut out = vec![Vec::with_capacity(frames); channel_count];
    for frame in bytes.chunks_exact(frame_bytes) {
        for (c, sample) in frame.chunks_exact(2).enumerate() {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            out[c].push(value as f32 / 32768.0);
        }
    }

    DecodedAudio {
        sample_rate,
        channels: out,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
