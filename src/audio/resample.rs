//! Audio resampling and channel mixing utilities.
//!
//! Voice input is listened to and recognized as **16 kHz mono `f32`**.
//! Microphones deliver whatever their native format is, so every captured
//! chunk goes through:
//!
//! 1. [`stereo_to_mono`] averages interleaved channels.
//! 2. [`StreamResampler`] converts to 16 000 Hz with `rubato`'s FFT
//!    resampler, which low-pass filters before decimating.

use rubato::{FftFixedIn, ResampleError, Resampler, ResamplerConstructionError};

const TARGET_RATE: u32 = 16_000;

/// Input frames per resampler call.
const RESAMPLER_CHUNK_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging.
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use voice_translator::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// // first frame: (0.5 + -0.5) / 2 = 0.0
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// // second frame: (0.2 + -0.2) / 2 = 0.0
/// assert!((mono[1] - 0.0).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// StreamResampler
// ---------------------------------------------------------------------------

/// Resampler to 16 kHz for audio that arrives in arbitrarily sized chunks.
///
/// Input is collected until a full resampler chunk is available, so a call
/// may return nothing and a later one several chunks' worth.  At 16 kHz
/// input passes through untouched.
pub struct StreamResampler {
    resampler: Option<FftFixedIn<f32>>,
    chunk_in: usize,
    in_buf: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32) -> Result<Self, ResamplerConstructionError> {
        let resampler = if source_rate == TARGET_RATE {
            None
        } else {
            Some(FftFixedIn::<f32>::new(
                source_rate as usize,
                TARGET_RATE as usize,
                RESAMPLER_CHUNK_SIZE,
                1,
                1,
            )?)
        };
        let chunk_in = resampler
            .as_ref()
            .map_or(RESAMPLER_CHUNK_SIZE, |r| r.input_frames_next());

        Ok(Self {
            resampler,
            chunk_in,
            in_buf: Vec::with_capacity(chunk_in),
        })
    }

    pub fn process(&mut self, mut chunk: &[f32]) -> Result<Vec<f32>, ResampleError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(chunk.to_vec());
        };

        let mut out = Vec::new();
        while !chunk.is_empty() {
            let take = (self.chunk_in - self.in_buf.len()).min(chunk.len());
            self.in_buf.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            if self.in_buf.len() == self.chunk_in {
                let resampled = resampler.process(&[&self.in_buf[..]], None)?;
                out.extend_from_slice(&resampled[0]);
                self.in_buf.clear();
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
