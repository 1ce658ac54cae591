//! Audio output sinks.
//!
//! [`AudioSink::play`] starts one [`DecodedAudio`] and returns a
//! [`PlayingSource`] handle for rate changes and stopping.  The sink calls
//! `on_finished` exactly once when the audio reaches its natural end; a
//! stopped source never calls it.
//!
//! * [`CpalSink`]: the default output device via `cpal`.
//! * [`TimedSink`]: silent fallback that only keeps time, used when no
//!   output device is available.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::decode::DecodedAudio;

/// Called once when a source plays to its end.
pub type FinishedCallback = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait AudioSink: Send + Sync {
    fn play(
        &self,
        audio: Arc<DecodedAudio>,
        rate: f32,
        on_finished: FinishedCallback,
    ) -> Result<Box<dyn PlayingSource>, OutputError>;
}

pub trait PlayingSource: Send {
    /// Change the playback rate of this source immediately.
    fn set_rate(&self, rate: f32);

    /// Stop this source.  `on_finished` is not called.
    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// OutputError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("output device uses unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio output thread is not running")]
    ThreadGone,

    #[error("timed playback needs a tokio runtime")]
    NoRuntime,
}

/// Playback rate stored as `f32` bits so the audio callback can read it
/// without locking.
#[derive(Clone)]
struct SharedRate(Arc<AtomicU32>);

impl SharedRate {
    fn new(rate: f32) -> Self {
        Self(Arc::new(AtomicU32::new(rate.to_bits())))
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, rate: f32) {
        self.0.store(rate.to_bits(), Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// CpalSink
// ---------------------------------------------------------------------------

/// The source currently owned by the output callback.
struct ActiveVoice {
    id: u64,
    audio: Arc<DecodedAudio>,
    /// Fractional frame position in the source.
    position: f64,
    rate: SharedRate,
    on_finished: Option<FinishedCallback>,
}

type VoiceSlot = Arc<Mutex<Option<ActiveVoice>>>;

fn lock_slot(slot: &VoiceSlot) -> MutexGuard<'_, Option<ActiveVoice>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Plays through the default output device.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated
/// `audio-output` thread for the lifetime of the sink.  Sources are handed
/// to the callback through a shared slot; one source plays at a time.
pub struct CpalSink {
    slot: VoiceSlot,
    next_id: AtomicU64,
    device_rate: u32,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device and start its stream.
    ///
    /// # Errors
    ///
    /// Any device or stream setup failure; callers fall back to
    /// [`TimedSink`].
    pub fn open() -> Result<Self, OutputError> {
        let slot: VoiceSlot = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, OutputError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_slot = Arc::clone(&slot);
        let thread = std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let stream = match build_stream(thread_slot) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Blocks until the sink is dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
                log::debug!("audio output thread exiting");
            })
            .map_err(|_| OutputError::ThreadGone)?;

        let device_rate = ready_rx.recv().map_err(|_| OutputError::ThreadGone)??;
        log::info!("audio output open at {device_rate} Hz");

        Ok(Self {
            slot,
            next_id: AtomicU64::new(1),
            device_rate,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn build_stream(slot: VoiceSlot) -> Result<(cpal::Stream, u32), OutputError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
    let supported = device.default_output_config()?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(OutputError::UnsupportedFormat(supported.sample_format()));
    }

    let device_rate = supported.sample_rate().0;
    let device_channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.into();

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            fill_output(&slot, data, device_channels, device_rate);
        },
        |err: cpal::StreamError| {
            log::error!("cpal output stream error: {err}");
        },
        None,
    )?;

    stream.play()?;
    Ok((stream, device_rate))
}

/// Render the active voice into `data` with linear interpolation, then fire
/// its completion callback outside the lock if it ran out.
fn fill_output(slot: &VoiceSlot, data: &mut [f32], device_channels: usize, device_rate: u32) {
    data.fill(0.0);
    let device_channels = device_channels.max(1);

    let mut finished = None;
    {
        let mut guard = lock_slot(slot);
        if let Some(voice) = guard.as_mut() {
            let frames = voice.audio.frames();
            let step = voice.audio.sample_rate as f64 / device_rate.max(1) as f64
                * voice.rate.get().max(0.0) as f64;

            for out in data.chunks_mut(device_channels) {
                if voice.position >= frames as f64 {
                    break;
                }
                let base = voice.position.floor() as usize;
                let frac = (voice.position - base as f64) as f32;
                for (c, sample) in out.iter_mut().enumerate() {
                    let a = voice.audio.sample(c, base);
                    let b = if base + 1 < frames {
                        voice.audio.sample(c, base + 1)
                    } else {
                        a
                    };
                    *sample = a + (b - a) * frac;
                }
                voice.position += step;
            }

            if voice.position >= frames as f64 {
                finished = guard.take().and_then(|v| v.on_finished);
            }
        }
    }

    if let Some(callback) = finished {
        callback();
    }
}

impl AudioSink for CpalSink {
    fn play(
        &self,
        audio: Arc<DecodedAudio>,
        rate: f32,
        on_finished: FinishedCallback,
    ) -> Result<Box<dyn PlayingSource>, OutputError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared_rate = SharedRate::new(rate);

        let voice = ActiveVoice {
            id,
            audio,
            position: 0.0,
            rate: shared_rate.clone(),
            on_finished: Some(on_finished),
        };
        *lock_slot(&self.slot) = Some(voice);

        Ok(Box::new(CpalSource {
            id,
            slot: Arc::clone(&self.slot),
            rate: shared_rate,
        }))
    }
}

struct CpalSource {
    id: u64,
    slot: VoiceSlot,
    rate: SharedRate,
}

impl PlayingSource for CpalSource {
    fn set_rate(&self, rate: f32) {
        self.rate.set(rate);
    }

    fn stop(&mut self) {
        let mut guard = lock_slot(&self.slot);
        if guard.as_ref().is_some_and(|v| v.id == self.id) {
            guard.take();
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// TimedSink
// ---------------------------------------------------------------------------

const TIMED_TICK: Duration = Duration::from_millis(50);

/// Produces no sound; reports completion after the audio's duration scaled
/// by the current rate.  Must be used from inside a tokio runtime.
#[derive(Default)]
pub struct TimedSink;

impl TimedSink {
    pub fn new() -> Self {
        Self
    }
}

impl AudioSink for TimedSink {
    fn play(
        &self,
        audio: Arc<DecodedAudio>,
        rate: f32,
        on_finished: FinishedCallback,
    ) -> Result<Box<dyn PlayingSource>, OutputError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| OutputError::NoRuntime)?;
        let token = CancellationToken::new();
        let shared_rate = SharedRate::new(rate);

        let total = audio.duration().as_secs_f64();
        let task_token = token.clone();
        let task_rate = shared_rate.clone();
        handle.spawn(async move {
            let mut played = 0.0_f64;
            while played < total {
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(TIMED_TICK) => {
                        played += TIMED_TICK.as_secs_f64() * task_rate.get().max(0.0) as f64;
                    }
                }
            }
            if !task_token.is_cancelled() {
                on_finished();
            }
        });

        Ok(Box::new(TimedSource {
            token,
            rate: shared_rate,
        }))
    }
}

struct TimedSource {
    token: CancellationToken,
    rate: SharedRate,
}

impl PlayingSource for TimedSource {
    fn set_rate(&self, rate: f32) {
        self.rate.set(rate);
    }

    fn stop(&mut self) {
        self.token.cancel();
    }
}

impl Drop for TimedSource {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ---------------------------------------------------------------------------
// Test sink
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn one_second() -> Arc<DecodedAudio> {
        Arc::new(DecodedAudio {
            sample_rate: 1_000,
            channels: vec![vec![0.0; 1_000]],
        })
    }

    fn flag() -> (Arc<AtomicBool>, FinishedCallback) {
        let done = Arc::new(AtomicBool::new(false));
        let d = Arc::clone(&done);
        (done, Box::new(move || d.store(true, Ordering::SeqCst)))
    }

    #[tokio::test(start_paused = true)]
    async fn timed_sink_finishes_after_scaled_duration() {
        let (done, cb) = flag();
        let _source = TimedSink::new().play(one_second(), 2.0, cb).unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!done.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_sink_stop_suppresses_callback() {
        let (done, cb) = flag();
        let mut source = TimedSink::new().play(one_second(), 1.0, cb).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        source.stop();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_sink_rate_change_applies_to_remaining_audio() {
        let (done, cb) = flag();
        let source = TimedSink::new().play(one_second(), 1.0, cb).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        source.set_rate(0.5);

        // 500ms remaining at half speed needs another second.
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!done.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn fill_output_interpolates_and_finishes() {
        let slot: VoiceSlot = Arc::new(Mutex::new(None));
        let (done, cb) = flag();
        *slot.lock().unwrap() = Some(ActiveVoice {
            id: 1,
            audio: Arc::new(DecodedAudio {
                sample_rate: 1,
                channels: vec![vec![0.0, 1.0]],
            }),
            position: 0.0,
            rate: SharedRate::new(1.0),
            on_finished: Some(cb),
        });

        // Device at 2 Hz stereo: half-frame steps, mono duplicated.
        let mut data = [9.0_f32; 10];
        fill_output(&slot, &mut data, 2, 2);

        assert_eq!(data[0..8], [0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(data[8..], [0.0; 2]);
        assert!(done.load(Ordering::SeqCst));
        assert!(slot.lock().unwrap().is_none());
    }

    #[test]
    fn stopping_cpal_source_clears_only_its_own_voice() {
        let slot: VoiceSlot = Arc::new(Mutex::new(None));
        *slot.lock().unwrap() = Some(ActiveVoice {
            id: 2,
            audio: one_second(),
            position: 0.0,
            rate: SharedRate::new(1.0),
            on_finished: None,
        });

        let mut stale = CpalSource {
            id: 1,
            slot: Arc::clone(&slot),
            rate: SharedRate::new(1.0),
        };
        stale.stop();
        assert!(slot.lock().unwrap().is_some());

        let mut current = CpalSource {
            id: 2,
            slot: Arc::clone(&slot),
            rate: SharedRate::new(1.0),
        };
        current.stop();
        assert!(slot.lock().unwrap().is_none());
    }
}
