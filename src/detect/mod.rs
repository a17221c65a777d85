//! Automatic source-language detection while the user types.
//!
//! [`LanguageDetector`] decides when a detection request may go out and
//! whether its result may change the source selection.  The orchestrator
//! performs the provider call and owns the clock.

pub mod detector;

pub use detector::{is_too_noisy, DetectDecision, DetectorSettings, LanguageDetector, SkipReason};
