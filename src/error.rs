//! [`OperationError`] — what a user-facing operation reports when it fails.
//!
//! Each subsystem keeps its own error enum; the orchestrator converts them
//! here before turning them into status notices.  Nothing in this taxonomy is
//! fatal.

use thiserror::Error;

use crate::audio::CaptureError;
use crate::catalog::{display_name, CatalogError};
use crate::stt::RecognitionError;
use crate::translate::TranslateError;
use crate::tts::{SpeechError, SynthesisError};
use crate::voice::VoiceError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("{0} is not supported")]
    UnsupportedLanguage(String),

    #[error("service unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No speech detected")]
    NoSpeechDetected,

    #[error("Could not understand the audio")]
    UnrecognizedSpeech,

    #[error("Speech recognition failed: {0}")]
    RecognitionServiceError(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("{0} is already in progress")]
    Busy(String),
}

impl From<TranslateError> for OperationError {
    fn from(e: TranslateError) -> Self {
        match e {
            TranslateError::UnsupportedLanguage(name) => {
                OperationError::UnsupportedLanguage(display_name(&name))
            }
            TranslateError::Busy => OperationError::Busy("Translation".into()),
            other => OperationError::ProviderUnavailable(other.to_string()),
        }
    }
}

impl From<SynthesisError> for OperationError {
    fn from(e: SynthesisError) -> Self {
        OperationError::ProviderUnavailable(e.to_string())
    }
}

impl From<SpeechError> for OperationError {
    fn from(e: SpeechError) -> Self {
        match e {
            SpeechError::AutoLanguage => OperationError::UnsupportedLanguage("Auto".into()),
            SpeechError::Synthesis(e) => e.into(),
            SpeechError::TempFile(msg) => OperationError::AudioDeviceError(msg),
            SpeechError::Output(e) => OperationError::AudioDeviceError(e.to_string()),
        }
    }
}

impl From<RecognitionError> for OperationError {
    fn from(e: RecognitionError) -> Self {
        match e {
            RecognitionError::Unrecognized => OperationError::UnrecognizedSpeech,
            RecognitionError::Service(msg) => OperationError::RecognitionServiceError(msg),
        }
    }
}

impl From<CaptureError> for OperationError {
    fn from(e: CaptureError) -> Self {
        OperationError::AudioDeviceError(e.to_string())
    }
}

impl From<CatalogError> for OperationError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(name) => OperationError::UnsupportedLanguage(display_name(&name)),
            CatalogError::AutoNotAllowed => OperationError::UnsupportedLanguage("Auto".into()),
        }
    }
}

impl From<VoiceError> for OperationError {
    fn from(e: VoiceError) -> Self {
        match e {
            VoiceError::AlreadyActive => OperationError::Busy("Voice input".into()),
            VoiceError::NoSpeechDetected => OperationError::NoSpeechDetected,
            VoiceError::Recognition(e) => e.into(),
            VoiceError::Device(msg) => OperationError::AudioDeviceError(msg),
            VoiceError::Interrupted(msg) => OperationError::RecognitionServiceError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OutputError;

    #[test]
    fn translation_errors() {
        assert_eq!(
            OperationError::from(TranslateError::UnsupportedLanguage("klingon".into())),
            OperationError::UnsupportedLanguage("Klingon".into())
        );
        assert_eq!(
            OperationError::from(TranslateError::Busy),
            OperationError::Busy("Translation".into())
        );
        assert!(matches!(
            OperationError::from(TranslateError::Timeout),
            OperationError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            OperationError::from(TranslateError::EmptyResponse),
            OperationError::ProviderUnavailable(_)
        ));
    }

    #[test]
    fn speech_errors() {
        assert_eq!(
            OperationError::from(SpeechError::AutoLanguage),
            OperationError::UnsupportedLanguage("Auto".into())
        );
        assert!(matches!(
            OperationError::from(SpeechError::Synthesis(SynthesisError::Timeout)),
            OperationError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            OperationError::from(SpeechError::Output(OutputError::NoDevice("none".into()))),
            OperationError::AudioDeviceError(_)
        ));
    }

    #[test]
    fn voice_errors() {
        assert_eq!(
            OperationError::from(VoiceError::NoSpeechDetected),
            OperationError::NoSpeechDetected
        );
        assert_eq!(
            OperationError::from(VoiceError::Recognition(RecognitionError::Unrecognized)),
            OperationError::UnrecognizedSpeech
        );
        assert_eq!(
            OperationError::from(VoiceError::Recognition(RecognitionError::Service("x".into()))),
            OperationError::RecognitionServiceError("x".into())
        );
        assert_eq!(
            OperationError::from(VoiceError::AlreadyActive).to_string(),
            "Voice input is already in progress"
        );
        assert!(matches!(
            OperationError::from(CaptureError::NoDevice),
            OperationError::AudioDeviceError(_)
        ));
    }
}
