//! Progress reports from background operations to the orchestrator.
//!
//! Workers never touch application state.  They hold a [`StatusReporter`]
//! and describe what they are doing; the orchestrator folds the updates into
//! its state and the status line.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPhase {
    Synthesizing,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Calibrating,
    Listening,
    Recognizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient message for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Phase of speech session `session`; `None` when it has ended.
    Speech {
        session: u64,
        phase: Option<SpeechPhase>,
    },
    /// Phase of the voice capture; `None` when idle again.
    Capture(Option<CapturePhase>),
    Notice(Notice),
}

/// Cloneable sending side for [`StatusUpdate`]s.
///
/// Sends never fail from the caller's point of view: once the orchestrator
/// has gone away there is nobody left to inform.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusReporter {
    pub fn new(tx: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn speech(&self, session: u64, phase: Option<SpeechPhase>) {
        let _ = self.tx.send(StatusUpdate::Speech { session, phase });
    }

    pub fn capture(&self, phase: Option<CapturePhase>) {
        let _ = self.tx.send(StatusUpdate::Capture(phase));
    }

    pub fn notice(&self, notice: Notice) {
        let _ = self.tx.send(StatusUpdate::Notice(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_forwards_updates_in_order() {
        let (reporter, mut rx) = StatusReporter::channel();
        reporter.capture(Some(CapturePhase::Listening));
        reporter.notice(Notice::warning("fallback"));
        reporter.speech(3, None);

        assert_eq!(
            rx.try_recv().unwrap(),
            StatusUpdate::Capture(Some(CapturePhase::Listening))
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StatusUpdate::Notice(Notice::warning("fallback"))
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StatusUpdate::Speech {
                session: 3,
                phase: None
            }
        );
    }

    #[test]
    fn reporting_after_receiver_dropped_is_silent() {
        let (reporter, rx) = StatusReporter::channel();
        drop(rx);
        reporter.notice(Notice::info("nobody listens"));
    }
}
