//! [`Orchestrator`] — the control task that owns [`ApplicationState`].
//!
//! Front ends send [`Command`]s over a `tokio::sync::mpsc` channel and
//! receive [`ViewEvent`]s back.  Everything slow runs on worker tasks;
//! their results come back to this one task, which is the only place state
//! is read or written.
//!
//! # Flow
//!
//! ```text
//! EditSource       → LanguageDetector ──(now / at deadline)──▶ detect worker
//! Translate        → TranslationExecutor::begin ──▶ translation worker
//! Speak(pane)      → AudioPlaybackController::speak (speech worker)
//! StartVoiceInput  → VoiceCaptureController (capture worker)
//!                      └─ Ok(text) → source pane → begin(Chained)
//!
//! worker results, StatusUpdates ──▶ ApplicationState ──▶ ViewEvent::Status
//! ```
//!
//! When the command channel closes, playback is stopped and the
//! orchestrator returns its final state once every worker has reported.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::catalog::{CatalogStatus, LanguageCatalog, SourceLanguage};
use crate::config::AppConfig;
use crate::detect::{DetectDecision, DetectorSettings, LanguageDetector};
use crate::error::OperationError;
use crate::status::{Notice, NoticeLevel, StatusUpdate};
use crate::translate::{
    Begin, TranslateError, TranslationExecutor, TranslationOutcome, TranslationRequest,
    TranslationTask, Translator, Trigger,
};
use crate::tts::{AudioPlaybackController, SpeakOutcome, SpeechError};
use crate::voice::{VoiceCaptureController, VoiceError};

use super::state::{ApplicationState, SelectionState};

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Source,
    Dest,
}

/// User actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the source pane text.
    EditSource(String),
    /// `"auto"`, a language name or a code.
    SelectSource(String),
    /// A language name or a code.
    SelectDest(String),
    Swap,
    Translate,
    Speak(Pane),
    StopSpeech,
    StartVoiceInput,
}

/// What the front end should show.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Voice input replaced the source pane.
    SourceReplaced(String),
    /// New destination pane text.
    Translated(String),
    SelectionChanged { source: SourceLanguage, dest: String },
    Notice(Notice),
    /// The status line changed.
    Status(String),
}

/// Providers and controllers the orchestrator drives.
pub struct Services {
    pub translator: Arc<dyn Translator>,
    pub catalog: Arc<LanguageCatalog>,
    pub catalog_status: CatalogStatus,
    pub playback: Arc<AudioPlaybackController>,
    pub voice: Arc<VoiceCaptureController>,
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    state: ApplicationState,
    translator: Arc<dyn Translator>,
    catalog: Arc<LanguageCatalog>,
    playback: Arc<AudioPlaybackController>,
    voice: Arc<VoiceCaptureController>,
    executor: TranslationExecutor,
    detector: LanguageDetector,
    notice_ttl: Duration,

    detections: JoinSet<Result<String, TranslateError>>,
    captures: JoinSet<Result<String, VoiceError>>,
    speeches: JoinSet<Result<SpeakOutcome, SpeechError>>,
    outcome_tx: mpsc::UnboundedSender<TranslationOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<TranslationOutcome>,
    status_rx: mpsc::UnboundedReceiver<StatusUpdate>,

    events: mpsc::UnboundedSender<ViewEvent>,
    last_status: Option<String>,
}

impl Orchestrator {
    /// `status_rx` must be the receiving side of the reporter handed to the
    /// playback and voice controllers.
    pub fn new(
        services: Services,
        config: &AppConfig,
        status_rx: mpsc::UnboundedReceiver<StatusUpdate>,
        events: mpsc::UnboundedSender<ViewEvent>,
    ) -> Self {
        let selection = SelectionState::from_config(&config.ui, &services.catalog);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            state: ApplicationState::new(selection, services.catalog_status),
            executor: TranslationExecutor::new(
                Arc::clone(&services.translator),
                Arc::clone(&services.catalog),
            ),
            detector: LanguageDetector::new(DetectorSettings::from(&config.detection)),
            translator: services.translator,
            catalog: services.catalog,
            playback: services.playback,
            voice: services.voice,
            notice_ttl: config.ui.status_clear(),
            detections: JoinSet::new(),
            captures: JoinSet::new(),
            speeches: JoinSet::new(),
            outcome_tx,
            outcome_rx,
            status_rx,
            events,
            last_status: None,
        }
    }

    /// Process commands until the channel closes and every worker has
    /// finished, then return the final state.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> ApplicationState {
        log::info!("pipeline: started ({})", self.state.selection_line());
        self.emit_selection();
        self.publish_status();

        let mut accepting = true;
        loop {
            let detect_at = if accepting {
                self.detector
                    .next_deadline(self.state.selection.last_manual_change)
            } else {
                None
            };
            let notice_at = self.state.notice_expires;

            tokio::select! {
                command = commands.recv(), if accepting => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        accepting = false;
                        self.begin_shutdown();
                    }
                },
                Some(outcome) = self.outcome_rx.recv() => self.on_translation(outcome),
                Some(update) = self.status_rx.recv() => self.on_status(update),
                Some(joined) = self.detections.join_next() => {
                    let result = joined.unwrap_or_else(|e| {
                        log::error!("pipeline: detection worker failed: {e}");
                        Err(TranslateError::Interrupted)
                    });
                    self.on_detected(result);
                }
                Some(joined) = self.captures.join_next() => {
                    let result = joined.unwrap_or_else(|e| {
                        log::error!("pipeline: capture worker failed: {e}");
                        Err(VoiceError::Interrupted(e.to_string()))
                    });
                    self.on_captured(result);
                }
                Some(joined) = self.speeches.join_next() => match joined {
                    Ok(result) => self.on_spoken(result),
                    Err(e) => {
                        log::error!("pipeline: speech worker failed: {e}");
                        self.state.activity.speech = None;
                    }
                },
                () = sleep_until(detect_at) => self.on_detect_deadline(),
                () = sleep_until(notice_at) => {
                    self.state.expire_notice(Instant::now());
                }
            }

            self.publish_status();
            if !accepting && self.is_drained() {
                break;
            }
        }

        // Reports sent just before a worker finished may still be queued.
        while let Ok(update) = self.status_rx.try_recv() {
            self.on_status(update);
        }
        log::info!("pipeline: stopped");
        self.state
    }

    // ---- commands ---

    fn handle_command(&mut self, command: Command) {
        log::debug!("pipeline: {command:?}");
        let now = Instant::now();
        match command {
            Command::EditSource(text) => self.set_source_text(text, now),
            Command::SelectSource(input) => self.select_source(&input, now),
            Command::SelectDest(input) => self.select_dest(&input, now),
            Command::Swap => {
                if self.state.selection.swap(now) {
                    self.emit_selection();
                } else {
                    self.notify(Notice::warning("Pick a source language before swapping"));
                }
            }
            Command::Translate => self.begin_translation(Trigger::Manual),
            Command::Speak(pane) => self.speak(pane),
            Command::StopSpeech => self.stop_speech(),
            Command::StartVoiceInput => self.start_voice_input(),
        }
    }

    fn set_source_text(&mut self, text: String, now: Instant) {
        self.state.source_text = text;
        let decision = self.detector.on_text_changed(
            &self.state.source_text,
            now,
            self.state.selection.last_manual_change,
        );
        if let DetectDecision::Issue(text) = decision {
            self.spawn_detection(text);
        }
    }

    fn select_source(&mut self, input: &str, now: Instant) {
        let source = match SourceLanguage::parse(input) {
            SourceLanguage::Auto => SourceLanguage::Auto,
            SourceLanguage::Named(name) => match self.catalog.canonical_name(&name) {
                Ok(canonical) => SourceLanguage::named(canonical),
                Err(e) => return self.report(e.into()),
            },
        };
        self.state.selection.select_source(source, now);
        self.emit_selection();
    }

    fn select_dest(&mut self, input: &str, now: Instant) {
        match self.catalog.canonical_name(input) {
            Ok(canonical) => {
                let canonical = canonical.to_string();
                self.state.selection.select_dest(canonical, now);
                self.emit_selection();
            }
            Err(e) => self.report(e.into()),
        }
    }

    // ---- translation ---

    fn begin_translation(&mut self, trigger: Trigger) {
        let request = TranslationRequest {
            text: self.state.source_text.clone(),
            source: self.state.selection.source.clone(),
            dest: self.state.selection.dest.clone(),
        };
        match self.executor.begin(request, trigger) {
            Ok(Begin::Empty) => log::debug!("pipeline: nothing to translate"),
            Ok(Begin::Started(task)) => self.start_translation(task),
            Ok(Begin::Queued) => log::debug!("pipeline: translation queued"),
            Err(e) => self.report(e.into()),
        }
        self.state.activity.translating = self.executor.is_busy();
    }

    fn start_translation(&self, task: TranslationTask) {
        tokio::spawn(task.run(self.outcome_tx.clone()));
    }

    fn on_translation(&mut self, outcome: TranslationOutcome) {
        let completion = self.executor.complete(outcome.generation);
        if let Some(next) = completion.next {
            self.start_translation(next);
        }
        self.state.activity.translating = self.executor.is_busy();
        if !completion.apply {
            return;
        }

        match outcome.result {
            Ok(text) => {
                log::info!("pipeline: translated {} chars", text.chars().count());
                self.state.dest_text = text.clone();
                self.emit(ViewEvent::Translated(text));
                self.notify(Notice::info("Translation complete"));
            }
            Err(e) => self.report(e.into()),
        }
    }

    // ---- detection ---

    fn spawn_detection(&mut self, text: String) {
        let translator = Arc::clone(&self.translator);
        self.detections
            .spawn(async move { translator.detect_language(&text).await });
        self.state.activity.detecting = true;
    }

    fn on_detect_deadline(&mut self) {
        let now = Instant::now();
        if let Some(text) = self
            .detector
            .on_deadline(now, self.state.selection.last_manual_change)
        {
            self.spawn_detection(text);
        }
    }

    fn on_detected(&mut self, result: Result<String, TranslateError>) {
        let detected = self.detector.on_result(
            result,
            Instant::now(),
            self.state.selection.last_manual_change,
            &self.state.selection.source,
            &self.catalog,
        );
        self.state.activity.detecting = self.detector.in_flight();

        if let Some(name) = detected {
            log::info!("pipeline: detected source language '{name}'");
            self.state.selection.source = SourceLanguage::named(&name);
            self.emit_selection();
        }
    }

    // ---- speech ---

    fn speak(&mut self, pane: Pane) {
        let (text, language) = match pane {
            Pane::Source => (
                self.state.source_text.clone(),
                self.state.selection.source.clone(),
            ),
            Pane::Dest => (
                self.state.dest_text.clone(),
                SourceLanguage::named(&self.state.selection.dest),
            ),
        };
        if text.trim().is_empty() {
            return;
        }
        let playback = Arc::clone(&self.playback);
        self.speeches
            .spawn(async move { playback.speak(&text, &language).await });
    }

    fn stop_speech(&self) {
        let playback = Arc::clone(&self.playback);
        tokio::spawn(async move { playback.stop().await });
    }

    fn on_spoken(&mut self, result: Result<SpeakOutcome, SpeechError>) {
        match result {
            Ok(outcome) => log::debug!("pipeline: speech ended: {outcome:?}"),
            Err(e) => self.report(e.into()),
        }
    }

    // ---- voice input ---

    fn start_voice_input(&mut self) {
        let voice = Arc::clone(&self.voice);
        let source = self.state.selection.source.clone();
        self.captures
            .spawn(async move { voice.capture_and_recognize(&source).await });
    }

    fn on_captured(&mut self, result: Result<String, VoiceError>) {
        match result {
            Ok(text) if text.trim().is_empty() => self.report(OperationError::NoSpeechDetected),
            Ok(text) => {
                self.emit(ViewEvent::SourceReplaced(text.clone()));
                self.set_source_text(text, Instant::now());
                self.notify(Notice::info("Voice input successful"));
                self.begin_translation(Trigger::Chained);
            }
            Err(e) => self.report(e.into()),
        }
    }

    // ---- status ---

    fn on_status(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::Speech { session, phase } => {
                self.state.activity.apply_speech(session, phase)
            }
            StatusUpdate::Capture(phase) => self.state.activity.capture = phase,
            StatusUpdate::Notice(notice) => self.notify(notice),
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => log::info!("pipeline: {}", notice.message),
            NoticeLevel::Warning => log::warn!("pipeline: {}", notice.message),
            NoticeLevel::Error => log::error!("pipeline: {}", notice.message),
        }
        self.state
            .set_notice(notice.clone(), Instant::now(), self.notice_ttl);
        self.emit(ViewEvent::Notice(notice));
    }

    fn report(&mut self, error: OperationError) {
        self.notify(Notice::error(error.to_string()));
    }

    fn publish_status(&mut self) {
        let line = self.state.status_line();
        if self.last_status.as_deref() != Some(line.as_str()) {
            self.last_status = Some(line.clone());
            self.emit(ViewEvent::Status(line));
        }
    }

    fn emit_selection(&self) {
        self.emit(ViewEvent::SelectionChanged {
            source: self.state.selection.source.clone(),
            dest: self.state.selection.dest.clone(),
        });
    }

    fn emit(&self, event: ViewEvent) {
        // The front end may already be gone during shutdown.
        let _ = self.events.send(event);
    }

    // ---- shutdown ---

    fn begin_shutdown(&mut self) {
        log::info!("pipeline: command channel closed; waiting for workers");
        if !self.speeches.is_empty() {
            self.stop_speech();
        }
    }

    fn is_drained(&self) -> bool {
        !self.executor.is_busy()
            && self.detections.is_empty()
            && self.captures.is_empty()
            && self.speeches.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
