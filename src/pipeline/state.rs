//! Application state owned by the orchestrator.
//!
//! [`ApplicationState`] is the single source of truth for what the user sees:
//! both panes, the language selection, which operations are running and the
//! current notice.  Only the orchestrator task touches it; workers report
//! through messages, so no locking is needed.
//!
//! The status line is derived from the activity flags:
//!
//! ```text
//! Idle → Detecting → Idle
//! Idle → Translating → Idle
//! Idle → Calibrating → Listening → Recognizing → Idle (→ Translating)
//! Idle → Synthesizing → Playing → Idle
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::catalog::{display_name, CatalogStatus, LanguageCatalog, SourceLanguage};
use crate::config::UiConfig;
use crate::status::{CapturePhase, Notice, SpeechPhase};

// ---------------------------------------------------------------------------
// SelectionState
// ---------------------------------------------------------------------------

/// Source and destination selection.
///
/// Every user-initiated change stamps `last_manual_change`, which gates
/// automatic detection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    pub source: SourceLanguage,
    /// Canonical destination name.  Never `Auto`.
    pub dest: String,
    pub last_manual_change: Option<Instant>,
}

impl SelectionState {
    pub fn new(source: SourceLanguage, dest: impl Into<String>) -> Self {
        Self {
            source,
            dest: dest.into(),
            last_manual_change: None,
        }
    }

    /// Initial selection from the configured defaults, falling back to
    /// English for names the catalog does not know.
    pub fn from_config(ui: &UiConfig, catalog: &LanguageCatalog) -> Self {
        let source = match SourceLanguage::parse(&ui.default_source) {
            SourceLanguage::Auto => SourceLanguage::Auto,
            SourceLanguage::Named(name) => match catalog.canonical_name(&name) {
                Ok(canonical) => SourceLanguage::named(canonical),
                Err(e) => {
                    log::warn!("state: default source: {e}; using auto-detect");
                    SourceLanguage::Auto
                }
            },
        };
        let dest = catalog
            .canonical_name(&ui.default_dest)
            .or_else(|e| {
                log::warn!("state: default destination: {e}; using english");
                catalog.canonical_name("english")
            })
            .map(str::to_string)
            .ok()
            .or_else(|| catalog.names().next().map(str::to_string))
            .unwrap_or_else(|| "english".to_string());
        Self::new(source, dest)
    }

    pub fn select_source(&mut self, source: SourceLanguage, now: Instant) {
        self.source = source;
        self.last_manual_change = Some(now);
    }

    pub fn select_dest(&mut self, dest: impl Into<String>, now: Instant) {
        self.dest = dest.into();
        self.last_manual_change = Some(now);
    }

    /// Exchange source and destination.
    ///
    /// Returns `false` and changes nothing while the source is `Auto`.
    pub fn swap(&mut self, now: Instant) -> bool {
        let SourceLanguage::Named(source) = &mut self.source else {
            return false;
        };
        std::mem::swap(source, &mut self.dest);
        self.last_manual_change = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// Which background operations are currently running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub detecting: bool,
    pub translating: bool,
    pub capture: Option<CapturePhase>,
    /// Newest speech session and its phase.
    pub speech: Option<(u64, SpeechPhase)>,
}

impl Activity {
    /// Fold a speech status report in.  Reports from sessions older than the
    /// tracked one are ignored.
    pub fn apply_speech(&mut self, session: u64, phase: Option<SpeechPhase>) {
        let tracked = self.speech.map(|(id, _)| id);
        match phase {
            Some(phase) if tracked.map_or(true, |id| session >= id) => {
                self.speech = Some((session, phase));
            }
            None if tracked == Some(session) => self.speech = None,
            _ => {}
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.detecting && !self.translating && self.capture.is_none() && self.speech.is_none()
    }
}

// ---------------------------------------------------------------------------
// ApplicationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApplicationState {
    pub selection: SelectionState,
    pub source_text: String,
    pub dest_text: String,
    pub activity: Activity,
    pub notice: Option<Notice>,
    pub notice_expires: Option<Instant>,
    pub catalog_status: CatalogStatus,
}

impl ApplicationState {
    pub fn new(selection: SelectionState, catalog_status: CatalogStatus) -> Self {
        Self {
            selection,
            source_text: String::new(),
            dest_text: String::new(),
            activity: Activity::default(),
            notice: None,
            notice_expires: None,
            catalog_status,
        }
    }

    /// Show `notice` until `now + ttl`, replacing any previous one.
    pub fn set_notice(&mut self, notice: Notice, now: Instant, ttl: Duration) {
        self.notice = Some(notice);
        self.notice_expires = Some(now + ttl);
    }

    /// Drop the notice if it has expired.  Returns `true` if one was dropped.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        match self.notice_expires {
            Some(at) if at <= now => {
                self.notice = None;
                self.notice_expires = None;
                true
            }
            _ => false,
        }
    }

    /// One-line summary for the status bar.
    ///
    /// Running operations take precedence over notices; an idle application
    /// with a degraded catalog says so.
    pub fn status_line(&self) -> String {
        let activity = &self.activity;
        if let Some(phase) = activity.capture {
            return match phase {
                CapturePhase::Calibrating => "Adjusting microphone...",
                CapturePhase::Listening => "Listening... speak clearly",
                CapturePhase::Recognizing => "Processing speech...",
            }
            .to_string();
        }
        if activity.translating {
            return "Translating...".to_string();
        }
        if let Some((_, phase)) = activity.speech {
            return match phase {
                SpeechPhase::Synthesizing => "Generating speech...",
                SpeechPhase::Playing => "Playing...",
            }
            .to_string();
        }
        if let Some(notice) = &self.notice {
            return notice.message.clone();
        }
        if activity.detecting {
            return "Detecting language...".to_string();
        }
        match &self.catalog_status {
            CatalogStatus::Degraded { reason } => format!("Limited language list ({reason})"),
            CatalogStatus::Complete => "Ready".to_string(),
        }
    }

    /// Human-readable selection, e.g. `"Auto → Hindi"`.
    pub fn selection_line(&self) -> String {
        let source = match &self.selection.source {
            SourceLanguage::Auto => "Auto".to_string(),
            SourceLanguage::Named(name) => display_name(name),
        };
        format!("{source} → {}", display_name(&self.selection.dest))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
