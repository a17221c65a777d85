//! [`VoiceCaptureController`] — one microphone session at a time, from
//! calibration to recognized text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::audio::{CaptureError, Microphone};
use crate::catalog::{display_name, LanguageCatalog, SourceLanguage};
use crate::config::VoiceConfig;
use crate::status::{CapturePhase, Notice, StatusReporter};
use crate::stt::{RecognitionError, SpeechRecognizer};
use crate::voice::listener::{self, ListenError, ListenSettings};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoiceError {
    #[error("voice input is already active")]
    AlreadyActive,

    #[error("no speech detected")]
    NoSpeechDetected,

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("microphone error: {0}")]
    Device(String),

    /// A blocking worker panicked or was cancelled.
    #[error("voice worker stopped: {0}")]
    Interrupted(String),
}

impl From<CaptureError> for VoiceError {
    fn from(e: CaptureError) -> Self {
        VoiceError::Device(e.to_string())
    }
}

impl From<ListenError> for VoiceError {
    fn from(e: ListenError) -> Self {
        match e {
            ListenError::NoSpeech => VoiceError::NoSpeechDetected,
            ListenError::Device(e) => e.into(),
        }
    }
}

impl From<tokio::task::JoinError> for VoiceError {
    fn from(e: tokio::task::JoinError) -> Self {
        VoiceError::Interrupted(e.to_string())
    }
}

/// Clears the active flag and reports idle when the session ends, however it
/// ends.
struct ActiveSession<'a> {
    active: &'a AtomicBool,
    status: &'a StatusReporter,
}

impl<'a> ActiveSession<'a> {
    fn acquire(active: &'a AtomicBool, status: &'a StatusReporter) -> Option<Self> {
        active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { active, status })
    }
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.status.capture(None);
    }
}

/// Uppercase the first character and lowercase the rest.
///
/// ```
/// use voice_translator::voice::capitalize_first;
///
/// assert_eq!(capitalize_first("bonjour tout le MONDE"), "Bonjour tout le monde");
/// assert_eq!(capitalize_first("éa"), "Éa");
/// ```
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// VoiceCaptureController
// ---------------------------------------------------------------------------

pub struct VoiceCaptureController {
    microphone: Arc<dyn Microphone>,
    recognizer: Arc<dyn SpeechRecognizer>,
    catalog: Arc<LanguageCatalog>,
    status: StatusReporter,
    settings: ListenSettings,
    fallback_language: String,
    active: AtomicBool,
}

impl VoiceCaptureController {
    pub fn new(
        microphone: Arc<dyn Microphone>,
        recognizer: Arc<dyn SpeechRecognizer>,
        catalog: Arc<LanguageCatalog>,
        status: StatusReporter,
        config: &VoiceConfig,
    ) -> Self {
        Self {
            microphone,
            recognizer,
            catalog,
            status,
            settings: ListenSettings::from(config),
            fallback_language: config.fallback_language.clone(),
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Record one utterance and return its text with the first letter
    /// capitalized.
    ///
    /// Fails with [`VoiceError::AlreadyActive`] while another capture runs.
    pub async fn capture_and_recognize(
        &self,
        source: &SourceLanguage,
    ) -> Result<String, VoiceError> {
        let _session =
            ActiveSession::acquire(&self.active, &self.status).ok_or(VoiceError::AlreadyActive)?;

        let code = self.recognition_code(source);
        log::info!("voice: capture started ('{code}')");
        self.status.capture(Some(CapturePhase::Calibrating));

        let microphone = Arc::clone(&self.microphone);
        let settings = self.settings.clone();
        let status = self.status.clone();
        let samples = tokio::task::spawn_blocking(move || -> Result<Vec<f32>, VoiceError> {
            let mut stream = microphone.open()?;
            let vad = listener::calibrate(stream.as_mut(), &settings)?;
            status.capture(Some(CapturePhase::Listening));
            Ok(listener::listen(stream.as_mut(), &vad, &settings)?)
        })
        .await??;

        if samples.is_empty() {
            return Err(VoiceError::NoSpeechDetected);
        }

        self.status.capture(Some(CapturePhase::Recognizing));
        let recognizer = Arc::clone(&self.recognizer);
        let text = tokio::task::spawn_blocking(move || recognizer.recognize(&samples, &code))
            .await??;

        log::info!("voice: recognized {} chars", text.chars().count());
        Ok(capitalize_first(text.trim()))
    }

    /// Code handed to the recognizer for `source`.
    fn recognition_code(&self, source: &SourceLanguage) -> String {
        let SourceLanguage::Named(name) = source else {
            return self.fallback_language.clone();
        };
        match self.catalog.resolve_code(name) {
            Ok(code) if self.catalog.is_recognition_capable(code) => code.to_string(),
            _ => {
                self.status.notice(Notice::warning(format!(
                    "Voice input doesn't support {}; listening for English",
                    display_name(name)
                )));
                self.fallback_language.clone()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioStream, ScriptedMicrophone};
    use crate::catalog::{GOOGLE_LANGUAGES, GOOGLE_TTS_CODES};
    use crate::status::StatusUpdate;
    use crate::stt::MockRecognizer;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn speech_script() -> ScriptedMicrophone {
        ScriptedMicrophone::from_segments(&[(1.5, 0.0), (0.3, 0.0), (0.9, 0.3), (1.0, 0.0)])
    }

    fn controller(
        microphone: Arc<dyn Microphone>,
        recognizer: Arc<MockRecognizer>,
    ) -> (Arc<VoiceCaptureController>, UnboundedReceiver<StatusUpdate>) {
        let catalog = Arc::new(LanguageCatalog::from_pairs(GOOGLE_LANGUAGES, GOOGLE_TTS_CODES));
        let (status, rx) = StatusReporter::channel();
        let controller = VoiceCaptureController::new(
            microphone,
            recognizer,
            catalog,
            status,
            &VoiceConfig::default(),
        );
        (Arc::new(controller), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<StatusUpdate>) -> Vec<StatusUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    #[test]
    fn capitalizes_first_letter_and_lowercases_the_rest() {
        assert_eq!(capitalize_first("hello WORLD"), "Hello world");
        assert_eq!(capitalize_first("NASA launch"), "Nasa launch");
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("ß"), "SS");
    }

    #[tokio::test]
    async fn recognizes_and_capitalizes() {
        let recognizer = Arc::new(MockRecognizer::ok(" bonjour "));
        let (voice, mut rx) = controller(Arc::new(speech_script()), Arc::clone(&recognizer));

        let text = voice
            .capture_and_recognize(&SourceLanguage::named("french"))
            .await
            .unwrap();

        assert_eq!(text, "Bonjour");
        assert_eq!(*recognizer.codes.lock().unwrap(), vec!["fr".to_string()]);
        assert!(!voice.is_active());
        assert_eq!(
            drain(&mut rx),
            vec![
                StatusUpdate::Capture(Some(CapturePhase::Calibrating)),
                StatusUpdate::Capture(Some(CapturePhase::Listening)),
                StatusUpdate::Capture(Some(CapturePhase::Recognizing)),
                StatusUpdate::Capture(None),
            ]
        );
    }

    #[tokio::test]
    async fn auto_listens_for_english_without_notice() {
        let recognizer = Arc::new(MockRecognizer::ok("hello"));
        let (voice, mut rx) = controller(Arc::new(speech_script()), Arc::clone(&recognizer));

        voice.capture_and_recognize(&SourceLanguage::Auto).await.unwrap();

        assert_eq!(*recognizer.codes.lock().unwrap(), vec!["en".to_string()]);
        assert!(!drain(&mut rx)
            .iter()
            .any(|u| matches!(u, StatusUpdate::Notice(_))));
    }

    #[tokio::test]
    async fn unsupported_language_falls_back_with_notice() {
        let recognizer = Arc::new(MockRecognizer::ok("hello"));
        let (voice, mut rx) = controller(Arc::new(speech_script()), Arc::clone(&recognizer));

        voice
            .capture_and_recognize(&SourceLanguage::named("thai"))
            .await
            .unwrap();

        assert_eq!(*recognizer.codes.lock().unwrap(), vec!["en".to_string()]);
        assert!(drain(&mut rx)
            .iter()
            .any(|u| matches!(u, StatusUpdate::Notice(n) if n.message.contains("Thai"))));
    }

    #[tokio::test]
    async fn silence_is_no_speech_and_skips_recognition() {
        let recognizer = Arc::new(MockRecognizer::ok("never"));
        let mic = ScriptedMicrophone::from_segments(&[(1.5, 0.0)]);
        let (voice, _rx) = controller(Arc::new(mic), Arc::clone(&recognizer));

        let result = voice.capture_and_recognize(&SourceLanguage::Auto).await;

        assert_eq!(result, Err(VoiceError::NoSpeechDetected));
        assert!(recognizer.codes.lock().unwrap().is_empty());
        assert!(!voice.is_active());
    }

    #[tokio::test]
    async fn recognition_errors_pass_through() {
        let recognizer = Arc::new(MockRecognizer::err(RecognitionError::Unrecognized));
        let (voice, _rx) = controller(Arc::new(speech_script()), recognizer);
        assert_eq!(
            voice.capture_and_recognize(&SourceLanguage::Auto).await,
            Err(VoiceError::Recognition(RecognitionError::Unrecognized))
        );

        let recognizer = Arc::new(MockRecognizer::err(RecognitionError::Service("down".into())));
        let (voice, _rx) = controller(Arc::new(speech_script()), recognizer);
        assert_eq!(
            voice.capture_and_recognize(&SourceLanguage::Auto).await,
            Err(VoiceError::Recognition(RecognitionError::Service("down".into())))
        );
    }

    #[tokio::test]
    async fn missing_device_is_a_device_error() {
        let mut mic = speech_script();
        mic.fail_open = true;
        let (voice, mut rx) = controller(Arc::new(mic), Arc::new(MockRecognizer::ok("x")));

        let result = voice.capture_and_recognize(&SourceLanguage::Auto).await;

        assert!(matches!(result, Err(VoiceError::Device(_))));
        assert_eq!(drain(&mut rx).last(), Some(&StatusUpdate::Capture(None)));
    }

    /// Blocks in `open` until the test releases it.
    struct GatedMicrophone {
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
        inner: ScriptedMicrophone,
    }

    impl Microphone for GatedMicrophone {
        fn open(&self) -> Result<Box<dyn AudioStream>, CaptureError> {
            let _ = self.release.lock().unwrap().recv();
            self.inner.open()
        }
    }

    #[tokio::test]
    async fn second_capture_is_rejected_while_active() {
        let (release, gate) = std::sync::mpsc::channel();
        let mic = GatedMicrophone {
            release: std::sync::Mutex::new(gate),
            inner: speech_script(),
        };
        let opened = Arc::clone(&mic.inner.opened);
        let (voice, mut rx) = controller(Arc::new(mic), Arc::new(MockRecognizer::ok("hola")));

        let first = {
            let voice = Arc::clone(&voice);
            tokio::spawn(async move { voice.capture_and_recognize(&SourceLanguage::Auto).await })
        };
        assert_eq!(
            rx.recv().await,
            Some(StatusUpdate::Capture(Some(CapturePhase::Calibrating)))
        );
        assert!(voice.is_active());

        let second = voice.capture_and_recognize(&SourceLanguage::Auto).await;
        assert_eq!(second, Err(VoiceError::AlreadyActive));

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Ok("Hola".to_string()));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert!(!voice.is_active());
    }
}
