//! Voice input: calibrate, listen for one utterance, recognize it.
//!
//! ```text
//! VoiceCaptureController::capture_and_recognize(source)
//!   → Microphone::open            (spawn_blocking)
//!   → listener::calibrate/listen  (energy threshold, timeout, pause)
//!   → SpeechRecognizer::recognize (spawn_blocking)
//!   → capitalized text
//! ```

pub mod controller;
pub mod listener;

pub use controller::{capitalize_first, VoiceCaptureController, VoiceError};
pub use listener::{ListenError, ListenSettings};
