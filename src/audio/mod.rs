//! Audio devices and signal utilities.
//!
//! # Input
//!
//! ```text
//! Microphone::open → cpal callback → AudioChunk (mpsc) → stereo_to_mono
//!                  → StreamResampler (16 kHz) → AudioStream::read
//! ```
//!
//! [`VadDetector`] turns the 16 kHz stream into speech/silence decisions.
//!
//! # Output
//!
//! [`AudioOutput::play`] → [`PlaybackHandle`] (stop + completion signal).

pub mod capture;
pub mod output;
pub mod resample;
pub mod vad;

pub use capture::{AudioChunk, AudioStream, CaptureError, CpalMicrophone, Microphone};
pub use output::{AudioOutput, OutputError, PlaybackCompletion, PlaybackHandle, RodioOutput};
pub use resample::{stereo_to_mono, StreamResampler};
pub use vad::{rms, VadDetector, DEFAULT_AMBIENT_FACTOR, FRAME_SAMPLES};

#[cfg(test)]
pub use capture::ScriptedMicrophone;
#[cfg(test)]
pub use output::FakeOutput;
