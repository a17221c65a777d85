//! [`AudioPlaybackController`] — speak text through the single audio output.
//!
//! At most one playback is alive.  The current session sits in a mutex-guarded
//! slot; whoever wants the device locks the slot, stops and awaits the
//! previous session, then starts its own.  Every `speak` takes a new session
//! id, and a request whose id is no longer the latest when it reaches the
//! slot gives up without touching the device, so a newer request always wins
//! and requests never queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::audio::{AudioOutput, OutputError, PlaybackHandle};
use crate::catalog::{display_name, LanguageCatalog, SourceLanguage};
use crate::config::SpeechConfig;
use crate::status::{Notice, SpeechPhase, StatusReporter};
use crate::tts::registry::TempAudioRegistry;
use crate::tts::synth::{SpeechSynthesizer, SynthesisError};

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    #[error("choose a specific language to listen to, not Auto")]
    AutoLanguage,

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("failed to write temporary audio: {0}")]
    TempFile(String),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// How a `speak` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Empty text; nothing happened.
    Skipped,
    /// Played to the end.
    Finished,
    /// Stopped by a newer request or by [`AudioPlaybackController::stop`].
    Preempted,
    /// A newer request arrived while synthesizing; never played.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub delete_after_playback: bool,
    /// Spoken instead of languages the synthesizer cannot voice.
    pub fallback_language: String,
}

impl From<&SpeechConfig> for PlaybackSettings {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            delete_after_playback: config.delete_after_playback,
            fallback_language: config.fallback_language.clone(),
        }
    }
}

struct ActiveSession {
    id: u64,
    handle: PlaybackHandle,
}

// ---------------------------------------------------------------------------
// AudioPlaybackController
// ---------------------------------------------------------------------------

pub struct AudioPlaybackController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    registry: TempAudioRegistry,
    catalog: Arc<LanguageCatalog>,
    status: StatusReporter,
    settings: PlaybackSettings,
    session: Mutex<Option<ActiveSession>>,
    requested: AtomicU64,
}

impl AudioPlaybackController {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: Arc<dyn AudioOutput>,
        registry: TempAudioRegistry,
        catalog: Arc<LanguageCatalog>,
        status: StatusReporter,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            synthesizer,
            output,
            registry,
            catalog,
            status,
            settings,
            session: Mutex::new(None),
            requested: AtomicU64::new(0),
        }
    }

    /// Synthesize `text` in `language` and play it, replacing whatever is
    /// playing.  Resolves when this playback ends.
    pub async fn speak(
        &self,
        text: &str,
        language: &SourceLanguage,
    ) -> Result<SpeakOutcome, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SpeakOutcome::Skipped);
        }
        let SourceLanguage::Named(name) = language else {
            return Err(SpeechError::AutoLanguage);
        };

        let id = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let code = self.speakable_code(name);
        log::info!("playback: session {id} '{code}' ({} chars)", text.chars().count());

        self.status.speech(id, Some(SpeechPhase::Synthesizing));
        self.stop_session().await;

        let outcome = self.run_session(id, text, &code).await;
        self.status.speech(id, None);
        outcome
    }

    /// Stop the current playback and supersede any request still
    /// synthesizing.
    pub async fn stop(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
        self.stop_session().await;
    }

    /// Id of the most recent `speak` request.
    pub fn latest_session(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    fn is_latest(&self, id: u64) -> bool {
        self.requested.load(Ordering::SeqCst) == id
    }

    /// Code to synthesize `name` with, falling back when it cannot be
    /// voiced.
    fn speakable_code(&self, name: &str) -> String {
        let fallback = self.settings.fallback_language.clone();
        match self.catalog.resolve_code(name) {
            Ok(code) if self.catalog.is_tts_capable(code) => code.to_string(),
            Ok(_) => {
                self.status.notice(Notice::warning(format!(
                    "{} can't be spoken; using English",
                    display_name(name)
                )));
                fallback
            }
            Err(e) => {
                log::warn!("playback: {e}; falling back to '{fallback}'");
                self.status.notice(Notice::warning(format!(
                    "Unknown language {}; using English",
                    display_name(name)
                )));
                fallback
            }
        }
    }

    async fn stop_session(&self) {
        let previous = self.session.lock().await.take();
        if let Some(previous) = previous {
            log::debug!("playback: stopping session {}", previous.id);
            previous.handle.stop();
            previous.handle.finished().await;
        }
    }

    async fn run_session(&self, id: u64, text: &str, code: &str) -> Result<SpeakOutcome, SpeechError> {
        let audio = self.synthesizer.synthesize(text, code).await?;
        if !self.is_latest(id) {
            return Ok(SpeakOutcome::Superseded);
        }

        let path = self
            .registry
            .store(&audio)
            .map_err(|e| SpeechError::TempFile(e.to_string()))?;

        let handle = {
            let mut slot = self.session.lock().await;
            if !self.is_latest(id) {
                self.registry.discard(&path);
                return Ok(SpeakOutcome::Superseded);
            }
            if let Some(previous) = slot.take() {
                previous.handle.stop();
                previous.handle.finished().await;
            }
            let handle = match self.output.play(&path) {
                Ok(handle) => handle,
                Err(e) => {
                    self.registry.discard(&path);
                    return Err(e.into());
                }
            };
            *slot = Some(ActiveSession {
                id,
                handle: handle.clone(),
            });
            handle
        };

        self.status.speech(id, Some(SpeechPhase::Playing));
        handle.finished().await;

        {
            let mut slot = self.session.lock().await;
            if slot.as_ref().is_some_and(|s| s.id == id) {
                *slot = None;
            }
        }
        if self.settings.delete_after_playback {
            self.registry.discard(&path);
        }

        if self.is_latest(id) {
            log::debug!("playback: session {id} finished");
            Ok(SpeakOutcome::Finished)
        } else {
            log::debug!("playback: session {id} preempted");
            Ok(SpeakOutcome::Preempted)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FakeOutput;
    use crate::catalog::{GOOGLE_LANGUAGES, GOOGLE_TTS_CODES};
    use crate::status::StatusUpdate;
    use crate::tts::synth::MockSynthesizer;
    use tokio::sync::mpsc;

    struct Harness {
        controller: Arc<AudioPlaybackController>,
        synth: Arc<MockSynthesizer>,
        output: Arc<FakeOutput>,
        registry: TempAudioRegistry,
        status: mpsc::UnboundedReceiver<StatusUpdate>,
        _dir: tempfile::TempDir,
    }

    fn harness(synth: MockSynthesizer, delete_after_playback: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempAudioRegistry::in_dir(dir.path());
        let synth = Arc::new(synth);
        let output = Arc::new(FakeOutput::default());
        let (reporter, status) = StatusReporter::channel();
        let controller = Arc::new(AudioPlaybackController::new(
            synth.clone(),
            output.clone(),
            registry.clone(),
            Arc::new(LanguageCatalog::from_pairs(GOOGLE_LANGUAGES, GOOGLE_TTS_CODES)),
            reporter,
            PlaybackSettings {
                delete_after_playback,
                fallback_language: "en".into(),
            },
        ));
        Harness {
            controller,
            synth,
            output,
            registry,
            status,
            _dir: dir,
        }
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..10_000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    fn notices(rx: &mut mpsc::UnboundedReceiver<StatusUpdate>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if let StatusUpdate::Notice(n) = update {
                out.push(n);
            }
        }
        out
    }

    #[tokio::test]
    async fn empty_text_is_a_noop() {
        let h = harness(MockSynthesizer::new(), true);
        let outcome = h
            .controller
            .speak("   ", &SourceLanguage::named("english"))
            .await
            .unwrap();
        assert_eq!(outcome, SpeakOutcome::Skipped);
        assert_eq!(h.synth.call_count(), 0);
    }

    #[tokio::test]
    async fn auto_never_synthesizes() {
        let h = harness(MockSynthesizer::new(), true);
        let err = h
            .controller
            .speak("hello", &SourceLanguage::Auto)
            .await
            .unwrap_err();
        assert_eq!(err, SpeechError::AutoLanguage);
        assert_eq!(h.synth.call_count(), 0);
        assert!(h.output.events().is_empty());
    }

    #[tokio::test]
    async fn unspeakable_language_falls_back_with_notice() {
        let mut h = harness(MockSynthesizer::new(), true);
        let controller = h.controller.clone();
        let task = tokio::spawn(async move {
            controller.speak("sawubona", &SourceLanguage::named("zulu")).await
        });

        wait_until(|| h.output.active() == 1).await;
        h.output.finish_all();
        assert_eq!(task.await.unwrap().unwrap(), SpeakOutcome::Finished);

        assert_eq!(
            *h.synth.calls.lock().unwrap(),
            vec![("sawubona".to_string(), "en".to_string())]
        );
        let notices = notices(&mut h.status);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("Zulu"));
    }

    #[tokio::test]
    async fn second_speak_stops_first_before_playing() {
        let h = harness(MockSynthesizer::new(), true);

        let c1 = h.controller.clone();
        let first = tokio::spawn(async move { c1.speak("one", &SourceLanguage::named("english")).await });
        wait_until(|| h.output.active() == 1).await;

        let c2 = h.controller.clone();
        let second = tokio::spawn(async move { c2.speak("two", &SourceLanguage::named("french")).await });

        assert_eq!(first.await.unwrap().unwrap(), SpeakOutcome::Preempted);
        wait_until(|| h.output.events().len() == 3).await;

        let events = h.output.events();
        assert!(events[0].starts_with("play voice-translator-"));
        assert_eq!(events[1], "stop 0");
        assert!(events[2].starts_with("play voice-translator-"));
        assert_eq!(h.output.max_active(), 1);

        h.output.finish_all();
        assert_eq!(second.await.unwrap().unwrap(), SpeakOutcome::Finished);
    }

    #[tokio::test]
    async fn request_superseded_during_synthesis_never_plays() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let h = harness(MockSynthesizer::new().gated(gate.clone()), true);

        let c1 = h.controller.clone();
        let first = tokio::spawn(async move { c1.speak("one", &SourceLanguage::named("english")).await });
        wait_until(|| h.synth.call_count() == 1).await;

        let c2 = h.controller.clone();
        let second = tokio::spawn(async move { c2.speak("two", &SourceLanguage::named("english")).await });
        wait_until(|| h.synth.call_count() == 2).await;

        gate.add_permits(2);
        assert_eq!(first.await.unwrap().unwrap(), SpeakOutcome::Superseded);

        wait_until(|| h.output.active() == 1).await;
        assert_eq!(h.output.events().len(), 1);
        h.output.finish_all();
        assert_eq!(second.await.unwrap().unwrap(), SpeakOutcome::Finished);
    }

    #[tokio::test]
    async fn synthesis_failure_plays_nothing() {
        let h = harness(
            MockSynthesizer::failing(SynthesisError::Request("offline".into())),
            true,
        );
        let err = h
            .controller
            .speak("hello", &SourceLanguage::named("english"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Synthesis(_)));
        assert!(h.output.events().is_empty());
        assert!(h.registry.is_empty());
    }

    #[tokio::test]
    async fn finished_file_is_deleted_when_configured() {
        let h = harness(MockSynthesizer::new(), true);
        let controller = h.controller.clone();
        let task = tokio::spawn(async move {
            controller.speak("hello", &SourceLanguage::named("english")).await
        });
        wait_until(|| h.output.active() == 1).await;
        h.output.finish_all();
        task.await.unwrap().unwrap();

        assert_eq!(h.registry.len(), 1);
        assert_eq!(h.registry.cleanup(), 0, "file was already removed");
    }

    #[tokio::test]
    async fn kept_files_are_removed_at_cleanup() {
        let h = harness(MockSynthesizer::new(), false);
        let controller = h.controller.clone();
        let task = tokio::spawn(async move {
            controller.speak("hello", &SourceLanguage::named("english")).await
        });
        wait_until(|| h.output.active() == 1).await;
        h.output.finish_all();
        task.await.unwrap().unwrap();

        assert_eq!(h.registry.cleanup(), 1);
    }

    #[tokio::test]
    async fn stop_preempts_current_playback() {
        let h = harness(MockSynthesizer::new(), true);
        let controller = h.controller.clone();
        let task = tokio::spawn(async move {
            controller.speak("hello", &SourceLanguage::named("english")).await
        });
        wait_until(|| h.output.active() == 1).await;

        h.controller.stop().await;
        assert_eq!(task.await.unwrap().unwrap(), SpeakOutcome::Preempted);
        assert_eq!(h.output.active(), 0);
    }
}
