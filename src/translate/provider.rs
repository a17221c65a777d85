//! Core [`Translator`] trait and its error type.
//!
//! A translator covers the three calls the orchestrator needs from a
//! translation service: translating, detecting a language, and listing the
//! languages it supports.  Latency is unbounded and any call may fail or come
//! back empty; callers treat every result as untrusted.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::AUTO_CODE;

// ---------------------------------------------------------------------------
// TranslateError
// ---------------------------------------------------------------------------

/// Errors that can occur while translating or detecting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// HTTP transport or connection error, or a non-success status.
    #[error("translation request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("translation request timed out")]
    Timeout,

    /// The response could not be parsed as expected JSON.
    #[error("failed to parse translation response: {0}")]
    Parse(String),

    /// The provider answered but returned no usable text.
    #[error("translation service returned an empty response")]
    EmptyResponse,

    /// A language name did not resolve to a code.
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    /// A translation is already running and this trigger may not queue.
    #[error("a translation is already in progress")]
    Busy,

    /// The worker ended before delivering a result.
    #[error("translation was interrupted")]
    Interrupted,
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else {
            TranslateError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SourceCode
// ---------------------------------------------------------------------------

/// Resolved source language handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCode {
    /// Let the provider detect the source language.
    Auto,
    /// A concrete provider code such as `"en"`.
    Code(String),
}

impl SourceCode {
    /// Wire value: the code itself, or `"auto"`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Auto => AUTO_CODE,
            Self::Code(code) => code,
        }
    }
}

impl fmt::Display for SourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Translator trait
// ---------------------------------------------------------------------------

/// Async interface to a translation service.
///
/// Implementors must be `Send + Sync` so they can be shared across worker
/// tasks behind an `Arc<dyn Translator>`.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` into the `target` code.
    async fn translate(
        &self,
        text: &str,
        source: &SourceCode,
        target: &str,
    ) -> Result<String, TranslateError>;

    /// Detect the language of `text`, returning a provider code.
    async fn detect_language(&self, text: &str) -> Result<String, TranslateError>;

    /// Lowercase language name → code mapping.
    async fn supported_languages(&self) -> Result<BTreeMap<String, String>, TranslateError>;
}

// ---------------------------------------------------------------------------
// Mock translator (tests only)
// ---------------------------------------------------------------------------

/// Scriptable translator for unit tests.
///
/// By default every translation echoes `"[target] text"` and detection
/// answers `"en"`.  Every call is recorded.  With [`MockTranslator::gated`],
/// each `translate` call waits for a permit first, so tests decide when
/// in-flight requests complete.
#[cfg(test)]
pub struct MockTranslator {
    reply: Box<dyn Fn(&str, &SourceCode, &str) -> Result<String, TranslateError> + Send + Sync>,
    detection: std::sync::Mutex<Result<String, TranslateError>>,
    gate: Option<std::sync::Arc<tokio::sync::Semaphore>>,
    pub translate_calls: std::sync::Mutex<Vec<(String, String, String)>>,
    pub detect_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockTranslator {
    pub fn new() -> Self {
        Self {
            reply: Box::new(|text, _, target| Ok(format!("[{target}] {text}"))),
            detection: std::sync::Mutex::new(Ok("en".into())),
            gate: None,
            translate_calls: std::sync::Mutex::new(Vec::new()),
            detect_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn with_reply(
        mut self,
        reply: impl Fn(&str, &SourceCode, &str) -> Result<String, TranslateError> + Send + Sync + 'static,
    ) -> Self {
        self.reply = Box::new(reply);
        self
    }

    pub fn with_detection(self, result: Result<String, TranslateError>) -> Self {
        *self.detection.lock().unwrap() = result;
        self
    }

    pub fn gated(mut self, gate: std::sync::Arc<tokio::sync::Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn translate_count(&self) -> usize {
        self.translate_calls.lock().unwrap().len()
    }

    pub fn detect_count(&self) -> usize {
        self.detect_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &SourceCode,
        target: &str,
    ) -> Result<String, TranslateError> {
        self.translate_calls.lock().unwrap().push((
            text.to_string(),
            source.as_str().to_string(),
            target.to_string(),
        ));
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        (self.reply)(text, source, target)
    }

    async fn detect_language(&self, _text: &str) -> Result<String, TranslateError> {
        self.detect_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.detection.lock().unwrap().clone()
    }

    async fn supported_languages(&self) -> Result<BTreeMap<String, String>, TranslateError> {
        Ok(crate::catalog::GOOGLE_LANGUAGES
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_code_wire_values() {
        assert_eq!(SourceCode::Auto.as_str(), "auto");
        assert_eq!(SourceCode::Code("fr".into()).as_str(), "fr");
        assert_eq!(SourceCode::Code("zh-CN".into()).to_string(), "zh-CN");
    }

    #[test]
    fn error_display_names_the_language() {
        let e = TranslateError::UnsupportedLanguage("klingon".into());
        assert!(e.to_string().contains("klingon"));
    }
}
