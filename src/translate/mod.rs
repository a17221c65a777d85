//! Translation: the provider trait, concrete providers and the single-flight
//! executor.
//!
//! * [`Translator`] — async provider interface (translate, detect, list).
//! * [`GoogleTranslator`] / [`LibreTranslator`] — HTTP providers.
//! * [`TranslationExecutor`] — decides which request runs and whether its
//!   result is still current.

pub mod executor;
pub mod google;
pub mod libre;
pub mod provider;

pub use executor::{
    Begin, Completion, CompletionGuard, TranslationExecutor, TranslationOutcome,
    TranslationRequest, TranslationTask, Trigger,
};
pub use google::GoogleTranslator;
pub use libre::LibreTranslator;
pub use provider::{SourceCode, TranslateError, Translator};

#[cfg(test)]
pub use provider::MockTranslator;

use std::sync::Arc;

use crate::config::{TranslationBackend, TranslationConfig};

/// Build the configured translation provider.
pub fn from_config(config: &TranslationConfig) -> Arc<dyn Translator> {
    match config.backend {
        TranslationBackend::Google => Arc::new(GoogleTranslator::from_config(config)),
        TranslationBackend::LibreTranslate => Arc::new(LibreTranslator::from_config(config)),
    }
}
