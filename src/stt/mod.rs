//! Speech recognition for voice input.
//!
//! ```text
//!   16 kHz mono f32 ──▶ SpeechRecognizer::recognize(samples, code)
//!                            │
//!              ┌─────────────┴──────────────┐
//!              ▼                            ▼
//!      WhisperRecognizer            NoModelRecognizer
//!      (local GGML model)           (model missing)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_translator::stt::{SpeechRecognizer, TranscribeParams, WhisperRecognizer};
//!
//! let recognizer = WhisperRecognizer::load("models/ggml-base.bin", TranscribeParams::default())
//!     .expect("model not found");
//! let audio: Vec<f32> = vec![0.0; 16_000];
//! let text = recognizer.recognize(&audio, "fr");
//! ```

pub mod engine;
pub mod transcribe;

pub use engine::{NoModelRecognizer, RecognitionError, SpeechRecognizer, WhisperRecognizer};
pub use transcribe::{whisper_language, SamplingStrategy, TranscribeParams};

#[cfg(test)]
pub use engine::MockRecognizer;
