//! Microphone capture via `cpal`.
//!
//! [`Microphone::open`] acquires the input device and returns an
//! [`AudioStream`] that yields 16 kHz mono `f32` chunks.  Dropping the stream
//! releases the device.
//!
//! Opening and reading are blocking; callers run them on a blocking thread.
//! The stream itself is not required to be `Send`, since cpal streams are not
//! on every platform, so it must be used on the thread that opened it.

use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::resample::{stereo_to_mono, StreamResampler};

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The device delivered no audio within the read timeout.
    #[error("microphone stopped delivering audio")]
    Stalled,

    /// The device went away mid-stream.
    #[error("microphone disconnected")]
    Disconnected,

    #[error("failed to create resampler: {0}")]
    Resampler(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
}

// ---------------------------------------------------------------------------
// Microphone / AudioStream traits
// ---------------------------------------------------------------------------

/// An open input stream producing 16 kHz mono samples.
pub trait AudioStream {
    /// Block until the next chunk arrives or `timeout` elapses.
    ///
    /// The result may be empty while a resampler is still collecting input.
    /// Returns [`CaptureError::Stalled`] on timeout.
    fn read(&mut self, timeout: Duration) -> Result<Vec<f32>, CaptureError>;
}

/// A microphone that can be opened repeatedly, one stream at a time.
pub trait Microphone: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioStream>, CaptureError>;
}

// ---------------------------------------------------------------------------
// CpalMicrophone
// ---------------------------------------------------------------------------

/// The system default input device.
///
/// The device is looked up on every [`open`](Microphone::open), so a
/// microphone plugged in after startup is picked up.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

/// RAII guard that keeps the cpal stream alive while chunks are read.
struct CpalStream {
    _stream: cpal::Stream,
    rx: mpsc::Receiver<AudioChunk>,
    resampler: StreamResampler,
}

impl AudioStream for CpalStream {
    fn read(&mut self, timeout: Duration) -> Result<Vec<f32>, CaptureError> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Ok(self
                .resampler
                .process(&stereo_to_mono(&chunk.samples, chunk.channels))?),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(CaptureError::Stalled),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(CaptureError::Disconnected),
        }
    }
}

impl Microphone for CpalMicrophone {
    fn open(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();
        let resampler = StreamResampler::new(sample_rate)?;

        let (tx, rx) = mpsc::channel::<AudioChunk>();
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // The receiver is gone once the stream is being dropped.
                let _ = tx.send(AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            |err: cpal::StreamError| {
                log::error!("capture: cpal stream error: {err}");
            },
            None,
        )?;
        stream.play()?;

        log::debug!("capture: opened input at {sample_rate} Hz, {channels} ch");
        Ok(Box::new(CpalStream {
            _stream: stream,
            rx,
            resampler,
        }))
    }
}

// ---------------------------------------------------------------------------
// Scripted microphone (test-only)
// ---------------------------------------------------------------------------

/// Replays fixed 16 kHz chunks, then stalls or yields silence.
#[cfg(test)]
#[derive(Clone)]
pub struct ScriptedMicrophone {
    pub chunks: Vec<Vec<f32>>,
    /// After the script runs out: `true` → `Stalled`, `false` → endless silence.
    pub stall_at_end: bool,
    pub fail_open: bool,
    pub opened: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl ScriptedMicrophone {
    pub fn new(chunks: Vec<Vec<f32>>) -> Self {
        Self {
            chunks,
            stall_at_end: false,
            fail_open: false,
            opened: Default::default(),
        }
    }

    /// Build a script from `(seconds, amplitude)` segments in 30 ms chunks.
    pub fn from_segments(segments: &[(f32, f32)]) -> Self {
        let mut chunks = Vec::new();
        for &(secs, amplitude) in segments {
            let total = (secs * 16_000.0).round() as usize;
            let mut produced = 0;
            while produced < total {
                let n = 480.min(total - produced);
                // Alternate sign so the signal has no DC offset.
                chunks.push(
                    (0..n)
                        .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
                        .collect(),
                );
                produced += n;
            }
        }
        Self::new(chunks)
    }
}

#[cfg(test)]
struct ScriptedStream {
    chunks: std::collections::VecDeque<Vec<f32>>,
    stall_at_end: bool,
}

#[cfg(test)]
impl AudioStream for ScriptedStream {
    fn read(&mut self, _timeout: Duration) -> Result<Vec<f32>, CaptureError> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(chunk),
            None if self.stall_at_end => Err(CaptureError::Stalled),
            None => Ok(vec![0.0; 480]),
        }
    }
}

#[cfg(test)]
impl Microphone for ScriptedMicrophone {
    fn open(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
        self.opened
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_open {
            return Err(CaptureError::NoDevice);
        }
        Ok(Box::new(ScriptedStream {
            chunks: self.chunks.iter().cloned().collect(),
            stall_at_end: self.stall_at_end,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
