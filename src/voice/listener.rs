//! Blocking calibrate-then-listen loop over an [`AudioStream`].
//!
//! All timing is measured in samples at 16 kHz, so a stream that delivers
//! audio faster or slower than real time (tests, buffered devices) still
//! produces the same decisions.
//!
//! ```text
//! calibrate ──▶ wait for speech ──(timeout)──▶ NoSpeech
//!                     │ voice frame
//!                     ▼
//!               record phrase ──(pause | phrase limit)──▶ trimmed samples
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;

use crate::audio::{AudioStream, CaptureError, VadDetector, DEFAULT_AMBIENT_FACTOR, FRAME_SAMPLES};
use crate::config::VoiceConfig;

const SAMPLE_RATE: f32 = 16_000.0;

/// Silent frames kept from just before speech starts (~300 ms).
const PRE_ROLL_FRAMES: usize = 10;

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("no speech detected")]
    NoSpeech,

    #[error(transparent)]
    Device(#[from] CaptureError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListenSettings {
    pub calibration: Duration,
    pub timeout: Duration,
    pub phrase_limit: Duration,
    pub pause: Duration,
    pub min_energy_threshold: f32,
    pub ambient_factor: f32,
    /// Longest wait for a single chunk before the device counts as stalled.
    pub read_timeout: Duration,
}

impl From<&VoiceConfig> for ListenSettings {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            calibration: config.calibration(),
            timeout: config.timeout(),
            phrase_limit: config.phrase_limit(),
            pause: config.pause(),
            min_energy_threshold: config.min_energy_threshold,
            ambient_factor: DEFAULT_AMBIENT_FACTOR,
            read_timeout: Duration::from_secs(2),
        }
    }
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self::from(&VoiceConfig::default())
    }
}

fn samples_in(duration: Duration) -> usize {
    (duration.as_secs_f32() * SAMPLE_RATE).round() as usize
}

/// Splits an arbitrary chunk stream into fixed-size frames.
struct Framer<'a> {
    stream: &'a mut dyn AudioStream,
    read_timeout: Duration,
    carry: VecDeque<f32>,
}

impl<'a> Framer<'a> {
    fn new(stream: &'a mut dyn AudioStream, read_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
            carry: VecDeque::new(),
        }
    }

    fn next_frame(&mut self) -> Result<Vec<f32>, CaptureError> {
        while self.carry.len() < FRAME_SAMPLES {
            let chunk = self.stream.read(self.read_timeout)?;
            self.carry.extend(chunk);
        }
        Ok(self.carry.drain(..FRAME_SAMPLES).collect())
    }
}

/// Sample ambient noise and derive the speech threshold from it.
pub fn calibrate(
    stream: &mut dyn AudioStream,
    settings: &ListenSettings,
) -> Result<VadDetector, ListenError> {
    let wanted = samples_in(settings.calibration);
    let mut ambient = Vec::with_capacity(wanted);
    while ambient.len() < wanted {
        ambient.extend(stream.read(settings.read_timeout)?);
    }
    ambient.truncate(wanted);

    Ok(VadDetector::calibrate(
        &ambient,
        settings.ambient_factor,
        settings.min_energy_threshold,
    ))
}

/// Wait for speech and record one phrase.
///
/// Returns [`ListenError::NoSpeech`] if no voice frame arrives within
/// `settings.timeout`.  Recording stops after `settings.pause` of trailing
/// silence or at `settings.phrase_limit`, whichever comes first.  Leading and
/// trailing silence is trimmed from the result.
pub fn listen(
    stream: &mut dyn AudioStream,
    vad: &VadDetector,
    settings: &ListenSettings,
) -> Result<Vec<f32>, ListenError> {
    let timeout = samples_in(settings.timeout);
    let limit = samples_in(settings.phrase_limit).max(FRAME_SAMPLES);
    let pause = samples_in(settings.pause);

    let mut framer = Framer::new(stream, settings.read_timeout);
    let mut pre_roll: VecDeque<Vec<f32>> = VecDeque::with_capacity(PRE_ROLL_FRAMES);
    let mut waited = 0usize;

    let first = loop {
        let frame = framer.next_frame()?;
        if vad.is_voice(&frame) {
            break frame;
        }
        waited += frame.len();
        if waited >= timeout {
            return Err(ListenError::NoSpeech);
        }
        if pre_roll.len() == PRE_ROLL_FRAMES {
            pre_roll.pop_front();
        }
        pre_roll.push_back(frame);
    };

    let mut phrase: Vec<f32> = pre_roll.into_iter().flatten().collect();
    phrase.extend(first);
    let mut silence = 0usize;

    while phrase.len() < limit {
        let frame = framer.next_frame()?;
        if vad.is_voice(&frame) {
            silence = 0;
        } else {
            silence += frame.len();
        }
        phrase.extend(frame);
        if silence >= pause {
            break;
        }
    }
    phrase.truncate(limit);

    log::debug!(
        "listen: phrase of {:.2} s (waited {:.2} s)",
        phrase.len() as f32 / SAMPLE_RATE,
        waited as f32 / SAMPLE_RATE
    );
    Ok(vad.trim_silence(&phrase).to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
