//! [`TranslationExecutor`] — single-flight translation with generations.
//!
//! The executor is owned by the orchestrator and never awaits anything
//! itself.  [`TranslationExecutor::begin`] decides whether a request starts,
//! queues or is rejected, and hands back a [`TranslationTask`] to run on a
//! worker.  The worker reports through a [`TranslationOutcome`] that is
//! guaranteed to be sent (see [`CompletionGuard`]), and
//! [`TranslationExecutor::complete`] says whether the result may be applied
//! and which queued task, if any, starts next.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::catalog::{LanguageCatalog, SourceLanguage};
use crate::translate::provider::{SourceCode, TranslateError, Translator};

// ---------------------------------------------------------------------------
// Requests and tasks
// ---------------------------------------------------------------------------

/// What caused a translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user pressed translate.  Rejected while busy.
    Manual,
    /// Follow-up to a finished voice capture.  Queued while busy.
    Chained,
}

/// A translation request as read from the application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub source: SourceLanguage,
    /// Destination language name.  Never `Auto`.
    pub dest: String,
}

/// A resolved request, ready to be sent to the provider.
pub struct TranslationTask {
    pub generation: u64,
    pub request_text: String,
    pub source: SourceCode,
    pub dest_code: String,
    translator: Arc<dyn Translator>,
}

impl std::fmt::Debug for TranslationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationTask")
            .field("generation", &self.generation)
            .field("request_text", &self.request_text)
            .field("source", &self.source)
            .field("dest_code", &self.dest_code)
            .finish()
    }
}

/// Result reported by a translation worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub generation: u64,
    pub result: Result<String, TranslateError>,
}

/// Sends exactly one [`TranslationOutcome`] when dropped.
///
/// If the worker is aborted or panics before calling
/// [`CompletionGuard::deliver`], the outcome is
/// [`TranslateError::Interrupted`], so the orchestrator always learns that the
/// request is over and re-enables the trigger.
pub struct CompletionGuard {
    generation: u64,
    result: Option<Result<String, TranslateError>>,
    tx: mpsc::UnboundedSender<TranslationOutcome>,
}

impl CompletionGuard {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TranslationOutcome>) -> Self {
        Self {
            generation,
            result: None,
            tx,
        }
    }

    pub fn deliver(mut self, result: Result<String, TranslateError>) {
        self.result = Some(result);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let result = self
            .result
            .take()
            .unwrap_or(Err(TranslateError::Interrupted));
        // The orchestrator may already be gone during shutdown.
        let _ = self.tx.send(TranslationOutcome {
            generation: self.generation,
            result,
        });
    }
}

impl TranslationTask {
    /// Run the provider call and report through `tx`.
    ///
    /// The guard is armed before the future is first polled, so dropping the
    /// future unpolled still reports.
    pub fn run(
        self,
        tx: mpsc::UnboundedSender<TranslationOutcome>,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let guard = CompletionGuard::new(self.generation, tx);
        async move {
            log::debug!(
                "translate: gen {} {} → {} ({} chars)",
                self.generation,
                self.source,
                self.dest_code,
                self.request_text.chars().count()
            );
            let result = call_provider(
                self.translator.as_ref(),
                &self.request_text,
                &self.source,
                &self.dest_code,
            )
            .await;
            guard.deliver(result);
        }
    }
}

async fn call_provider(
    translator: &dyn Translator,
    text: &str,
    source: &SourceCode,
    dest_code: &str,
) -> Result<String, TranslateError> {
    let translated = translator.translate(text, source, dest_code).await?;
    if translated.trim().is_empty() {
        return Err(TranslateError::EmptyResponse);
    }
    Ok(translated)
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Outcome of [`TranslationExecutor::begin`].
#[derive(Debug)]
pub enum Begin {
    /// The input was empty; nothing to do and the destination stays as is.
    Empty,
    /// Run this task now.
    Started(TranslationTask),
    /// A request is in flight; this one will start when it completes.
    Queued,
}

/// What to do with a finished worker's result.
#[derive(Debug)]
pub struct Completion {
    /// `true` if the result belongs to the newest request.
    pub apply: bool,
    /// Queued task to start now, if any.
    pub next: Option<TranslationTask>,
}

pub struct TranslationExecutor {
    translator: Arc<dyn Translator>,
    catalog: Arc<LanguageCatalog>,
    current_generation: u64,
    in_flight: Option<u64>,
    queued: Option<TranslationTask>,
}

impl TranslationExecutor {
    pub fn new(translator: Arc<dyn Translator>, catalog: Arc<LanguageCatalog>) -> Self {
        Self {
            translator,
            catalog,
            current_generation: 0,
            in_flight: None,
            queued: None,
        }
    }

    /// Translate directly, outside the single-flight bookkeeping.
    ///
    /// Empty or whitespace-only input returns `""` without calling the
    /// provider.
    pub async fn translate(
        &self,
        text: &str,
        source: &SourceLanguage,
        dest: &str,
    ) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let (source, dest_code) = self.resolve(source, dest)?;
        call_provider(self.translator.as_ref(), text, &source, &dest_code).await
    }

    /// `true` while a request is running or queued.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.queued.is_some()
    }

    pub fn current_generation(&self) -> u64 {
        self.current_generation
    }

    /// Accept, queue or reject a request.
    ///
    /// Manual triggers are rejected with [`TranslateError::Busy`] while a
    /// request is running.  Chained triggers replace whatever was queued
    /// before them, and the in-flight result becomes stale.
    pub fn begin(
        &mut self,
        request: TranslationRequest,
        trigger: Trigger,
    ) -> Result<Begin, TranslateError> {
        if request.text.trim().is_empty() {
            return Ok(Begin::Empty);
        }
        if self.is_busy() && trigger == Trigger::Manual {
            return Err(TranslateError::Busy);
        }

        let (source, dest_code) = self.resolve(&request.source, &request.dest)?;
        self.current_generation += 1;
        let task = TranslationTask {
            generation: self.current_generation,
            request_text: request.text,
            source,
            dest_code,
            translator: Arc::clone(&self.translator),
        };

        if self.in_flight.is_some() {
            if let Some(dropped) = self.queued.replace(task) {
                log::debug!("translate: queued gen {} replaced", dropped.generation);
            }
            return Ok(Begin::Queued);
        }

        self.in_flight = Some(task.generation);
        Ok(Begin::Started(task))
    }

    /// Record that the worker for `generation` has finished.
    pub fn complete(&mut self, generation: u64) -> Completion {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
        let next = if self.in_flight.is_none() {
            self.queued.take()
        } else {
            None
        };
        if let Some(task) = &next {
            self.in_flight = Some(task.generation);
        }

        let apply = generation == self.current_generation;
        if !apply {
            log::debug!(
                "translate: discarding stale gen {generation} (current {})",
                self.current_generation
            );
        }
        Completion { apply, next }
    }

    fn resolve(
        &self,
        source: &SourceLanguage,
        dest: &str,
    ) -> Result<(SourceCode, String), TranslateError> {
        let source = match source {
            SourceLanguage::Auto => SourceCode::Auto,
            SourceLanguage::Named(name) => SourceCode::Code(
                self.catalog
                    .resolve_code(name)
                    .map_err(|_| TranslateError::UnsupportedLanguage(name.clone()))?
                    .to_string(),
            ),
        };
        let dest_code = self
            .catalog
            .resolve_code(dest)
            .map_err(|_| TranslateError::UnsupportedLanguage(dest.trim().to_string()))?
            .to_string();
        Ok((source, dest_code))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
