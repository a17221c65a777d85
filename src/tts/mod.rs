//! Text-to-speech: synthesis providers, the temporary audio registry and the
//! playback controller that owns the audio output.
//!
//! ```text
//! speak(text, language)
//!   → SpeechSynthesizer::synthesize → MP3 bytes
//!   → TempAudioRegistry::store      → temp file
//!   → AudioOutput::play             → PlaybackHandle (one at a time)
//! ```

pub mod playback;
pub mod registry;
pub mod synth;

pub use playback::{AudioPlaybackController, PlaybackSettings, SpeakOutcome, SpeechError};
pub use registry::TempAudioRegistry;
pub use synth::{split_chunks, GoogleTts, SpeechSynthesizer, SynthesisError, MAX_CHUNK_CHARS};

#[cfg(test)]
pub use synth::MockSynthesizer;
