//! Energy-based voice activity detection.
//!
//! [`VadDetector`] classifies 30 ms frames (480 samples @ 16 kHz) as voice
//! when their RMS amplitude exceeds a threshold.  The threshold is either
//! fixed or derived from a stretch of ambient noise with
//! [`VadDetector::calibrate`], which is what voice capture does before it
//! starts listening.

/// Samples per analysis frame: 30 ms at 16 kHz.
pub const FRAME_SAMPLES: usize = 480;

/// Ambient RMS is multiplied by this to get the speech threshold.
pub const DEFAULT_AMBIENT_FACTOR: f32 = 1.5;

/// Root-mean-square amplitude of `frame`; `0.0` for an empty frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Energy-based voice detector and silence trimmer.
///
/// # Example
///
/// ```rust
/// use voice_translator::audio::VadDetector;
///
/// let vad = VadDetector::new(0.01);
///
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// assert_eq!(vad.trim_silence(&audio).len(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct VadDetector {
    rms_threshold: f32,
    frame_size: usize,
}

impl VadDetector {
    pub fn new(rms_threshold: f32) -> Self {
        Self {
            rms_threshold,
            frame_size: FRAME_SAMPLES,
        }
    }

    /// Detector with a custom frame size (clamped to at least 1 sample).
    pub fn with_frame_size(rms_threshold: f32, frame_size: usize) -> Self {
        Self {
            rms_threshold,
            frame_size: frame_size.max(1),
        }
    }

    /// Derive the threshold from ambient noise.
    ///
    /// The threshold is `ambient RMS × factor`, but never below
    /// `min_threshold`, so a silent room does not make every click count as
    /// speech.
    pub fn calibrate(ambient: &[f32], factor: f32, min_threshold: f32) -> Self {
        let ambient_rms = rms(ambient);
        let threshold = (ambient_rms * factor).max(min_threshold);
        log::debug!("vad: ambient rms {ambient_rms:.4} → threshold {threshold:.4}");
        Self::new(threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.rms_threshold
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// `true` when `frame` carries voice energy.
    pub fn is_voice(&self, frame: &[f32]) -> bool {
        !frame.is_empty() && rms(frame) > self.rms_threshold
    }

    /// Trim leading and trailing silence from `audio`.
    ///
    /// Returns a sub-slice of the original buffer.  If the entire signal is
    /// silent, a zero-length slice is returned.
    pub fn trim_silence<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        let frames: Vec<&[f32]> = audio.chunks(self.frame_size).collect();

        let Some(first) = frames.iter().position(|f| self.is_voice(f)) else {
            return &audio[0..0];
        };
        let last = frames
            .iter()
            .rposition(|f| self.is_voice(f))
            .unwrap_or(first);

        let start = first * self.frame_size;
        let end = ((last + 1) * self.frame_size).min(audio.len());
        &audio[start..end]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signal(silent_pre: usize, voice: usize, silent_post: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; silent_pre];
        v.extend(vec![0.5_f32; voice]);
        v.extend(vec![0.0_f32; silent_post]);
        v
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn trims_leading_and_trailing_silence() {
        let audio = make_signal(480, 480, 480);
        let trimmed = VadDetector::new(0.01).trim_silence(&audio);
        assert_eq!(trimmed.len(), 480);
    }

    #[test]
    fn all_silence_returns_empty() {
        let audio = vec![0.0_f32; 1440];
        assert!(VadDetector::new(0.01).trim_silence(&audio).is_empty());
    }

    #[test]
    fn no_silence_returns_full_signal() {
        let audio = vec![0.5_f32; 960];
        assert_eq!(VadDetector::new(0.01).trim_silence(&audio).len(), 960);
    }

    #[test]
    fn custom_frame_size() {
        let vad = VadDetector::with_frame_size(0.01, 160);
        let audio = make_signal(160, 160, 160);
        assert_eq!(vad.trim_silence(&audio).len(), 160);
        assert_eq!(VadDetector::with_frame_size(0.01, 0).frame_size(), 1);
    }

    #[test]
    fn calibration_scales_ambient_noise() {
        let ambient = vec![0.02_f32; 16_000];
        let vad = VadDetector::calibrate(&ambient, 2.0, 0.01);
        assert!((vad.threshold() - 0.04).abs() < 1e-6);
        assert!(!vad.is_voice(&[0.03; 480]));
        assert!(vad.is_voice(&[0.2; 480]));
    }

    #[test]
    fn calibration_never_goes_below_floor() {
        let vad = VadDetector::calibrate(&vec![0.0_f32; 16_000], DEFAULT_AMBIENT_FACTOR, 0.01);
        assert!((vad.threshold() - 0.01).abs() < 1e-7);
    }
}
