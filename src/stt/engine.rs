//! Core speech-recognition trait and implementations.
//!
//! # Overview
//!
//! [`SpeechRecognizer`] is the interface used by voice capture.  It is
//! synchronous, object-safe and `Send + Sync`; callers run it on a blocking
//! thread behind an `Arc<dyn SpeechRecognizer>`.
//!
//! [`WhisperRecognizer`] wraps a `whisper_rs::WhisperContext` loaded from a
//! local GGML model.  [`NoModelRecognizer`] stands in when no model is
//! installed so the rest of the application keeps working.
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) returns a
//! pre-configured response.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::stt::transcribe::{is_non_speech, whisper_language, SamplingStrategy, TranscribeParams};

// ---------------------------------------------------------------------------
// RecognitionError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    /// The audio was processed but contained no intelligible speech.
    #[error("speech was not understood")]
    Unrecognized,

    /// The recognizer itself failed.
    #[error("recognition service error: {0}")]
    Service(String),
}

// ---------------------------------------------------------------------------
// SpeechRecognizer trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech recognizers.
///
/// # Contract
///
/// - `samples` are **16 kHz, mono, f32** PCM.
/// - `code` is a catalog code from the recognition set, e.g. `"fr"`.
/// - Blocking; may take seconds.
pub trait SpeechRecognizer: Send + Sync {
    fn recognize(&self, samples: &[f32], code: &str) -> Result<String, RecognitionError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

// ---------------------------------------------------------------------------
// Audio length constants (16 kHz mono f32)
// ---------------------------------------------------------------------------

/// Whisper needs at least 1 s of input; shorter clips are padded with silence.
const MIN_AUDIO_SAMPLES: usize = 16_000;
/// Upper bound, 30 s (one Whisper window).
const MAX_AUDIO_SAMPLES: usize = 480_000;

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

/// Local Whisper recognizer.
///
/// A new `WhisperState` is created for every call, so the recognizer can be
/// shared across threads without locking.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperRecognizer {}
unsafe impl Sync for WhisperRecognizer {}

impl WhisperRecognizer {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// [`RecognitionError::Service`] if the file is missing or whisper-rs
    /// cannot load it.
    pub fn load(
        model_path: impl AsRef<Path>,
        params: TranscribeParams,
    ) -> Result<Self, RecognitionError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(RecognitionError::Service(format!(
                "model not found: {}",
                path.display()
            )));
        }

        let path_str = path.to_str().ok_or_else(|| {
            RecognitionError::Service(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| RecognitionError::Service(format!("failed to load model: {e}")))?;

        log::info!("stt: loaded model {}", path.display());
        Ok(Self { ctx, params })
    }

    fn run(&self, samples: &[f32], language: &str) -> Result<String, RecognitionError> {
        use whisper_rs::SamplingStrategy as WS;
        let ws = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            } => WS::BeamSearch {
                beam_size,
                patience,
            },
        };

        let mut fp = FullParams::new(ws);
        fp.set_language(Some(language));
        fp.set_n_threads(self.params.n_threads);
        fp.set_translate(false);
        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        let started = std::time::Instant::now();
        state
            .full(fp, samples)
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| RecognitionError::Service(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        log::debug!(
            "stt: {n_segments} segment(s) in {} ms",
            started.elapsed().as_millis()
        );
        Ok(text.trim().to_string())
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(&self, samples: &[f32], code: &str) -> Result<String, RecognitionError> {
        if samples.is_empty() {
            return Err(RecognitionError::Unrecognized);
        }

        let mut audio = samples[..samples.len().min(MAX_AUDIO_SAMPLES)].to_vec();
        if audio.len() < MIN_AUDIO_SAMPLES {
            audio.resize(MIN_AUDIO_SAMPLES, 0.0);
        }

        let text = self.run(&audio, whisper_language(code))?;
        if is_non_speech(&text) {
            return Err(RecognitionError::Unrecognized);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// NoModelRecognizer
// ---------------------------------------------------------------------------

/// Placeholder used when no Whisper model is installed.
///
/// Every call fails with a service error naming the missing model, so voice
/// input reports a clear message instead of the application refusing to
/// start.
#[derive(Debug, Clone)]
pub struct NoModelRecognizer {
    reason: String,
}

impl NoModelRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechRecognizer for NoModelRecognizer {
    fn recognize(&self, _samples: &[f32], _code: &str) -> Result<String, RecognitionError> {
        Err(RecognitionError::Service(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response and records the
/// language codes it was asked for.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<String, RecognitionError>,
    pub codes: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            codes: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn err(error: RecognitionError) -> Self {
        Self {
            response: Err(error),
            codes: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl SpeechRecognizer for MockRecognizer {
    fn recognize(&self, _samples: &[f32], code: &str) -> Result<String, RecognitionError> {
        self.codes.lock().unwrap().push(code.to_string());
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_requested_code() {
        let recognizer = MockRecognizer::ok("bonjour");
        assert_eq!(recognizer.recognize(&[0.0; 10], "fr").unwrap(), "bonjour");
        assert_eq!(*recognizer.codes.lock().unwrap(), vec!["fr".to_string()]);
    }

    #[test]
    fn load_missing_model_is_a_service_error() {
        let result = WhisperRecognizer::load("/nonexistent/model.bin", TranscribeParams::default());
        match result {
            Err(RecognitionError::Service(msg)) => assert!(msg.contains("/nonexistent/model.bin")),
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[test]
    fn no_model_recognizer_always_fails() {
        let recognizer = NoModelRecognizer::new("Whisper model 'base' is not installed");
        let err = recognizer.recognize(&[0.1; 16_000], "en").unwrap_err();
        assert_eq!(
            err,
            RecognitionError::Service("Whisper model 'base' is not installed".into())
        );
    }

    #[test]
    fn box_dyn_recognizer_compiles() {
        let recognizer: Box<dyn SpeechRecognizer> = Box::new(MockRecognizer::ok("ok"));
        let _ = recognizer.recognize(&[], "en");
    }

    #[test]
    fn error_display() {
        assert!(RecognitionError::Service("boom".into())
            .to_string()
            .contains("boom"));
        assert!(RecognitionError::Unrecognized.to_string().contains("not understood"));
    }
}
