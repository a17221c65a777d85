//! [`LanguageDetector`] — debounce and cooldown gating for auto-detection.
//!
//! The detector holds no clock and performs no I/O.  The orchestrator feeds it
//! text edits, deadline wake-ups and provider results together with the
//! current instant, and it answers with what to do.  Because every decision
//! happens on the orchestrator's task, a manual selection change is always
//! observed before the next decision that depends on it.

use std::time::Duration;

use tokio::time::Instant;

use crate::catalog::{LanguageCatalog, SourceLanguage};
use crate::config::DetectionConfig;
use crate::translate::TranslateError;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub enabled: bool,
    pub min_interval: Duration,
    pub manual_change_cooldown: Duration,
    pub min_chars: usize,
    pub min_alpha_ratio: f32,
}

impl From<&DetectionConfig> for DetectorSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_interval: config.min_interval(),
            manual_change_cooldown: config.manual_change_cooldown(),
            min_chars: config.min_chars,
            min_alpha_ratio: config.min_alpha_ratio,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    TooNoisy,
}

/// Answer to a text-change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectDecision {
    /// Call the provider with this text now.
    Issue(String),
    /// Remembered as the pending text; see [`LanguageDetector::next_deadline`].
    Deferred,
    /// Nothing to do.
    Skipped(SkipReason),
}

/// `true` if `text` is too short or too symbol-heavy to detect reliably.
///
/// The alphabetic ratio is taken over non-whitespace characters.
///
/// ```
/// use voice_translator::detect::is_too_noisy;
///
/// assert!(is_too_noisy("123456", 3, 0.5));
/// assert!(is_too_noisy("hi", 3, 0.5));
/// assert!(!is_too_noisy("bonjour", 3, 0.5));
/// ```
pub fn is_too_noisy(text: &str, min_chars: usize, min_alpha_ratio: f32) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < min_chars {
        return true;
    }
    let (alpha, total) = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(a, t), c| {
            (a + usize::from(c.is_alphabetic()), t + 1)
        });
    total == 0 || (alpha as f32 / total as f32) < min_alpha_ratio
}

// ---------------------------------------------------------------------------
// LanguageDetector
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LanguageDetector {
    settings: DetectorSettings,
    last_detection: Option<Instant>,
    in_flight: bool,
    pending: Option<String>,
}

impl LanguageDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            settings,
            last_detection: None,
            in_flight: false,
            pending: None,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Handle an edit of the source text.
    pub fn on_text_changed(
        &mut self,
        text: &str,
        now: Instant,
        last_manual: Option<Instant>,
    ) -> DetectDecision {
        if !self.settings.enabled {
            return DetectDecision::Skipped(SkipReason::Disabled);
        }
        if is_too_noisy(text, self.settings.min_chars, self.settings.min_alpha_ratio) {
            // The latest text wins; an older pending text is no longer current.
            self.pending = None;
            return DetectDecision::Skipped(SkipReason::TooNoisy);
        }

        self.pending = Some(text.to_string());
        match self.try_issue(now, last_manual) {
            Some(text) => DetectDecision::Issue(text),
            None => DetectDecision::Deferred,
        }
    }

    /// Earliest instant the pending text may be sent, if any.
    ///
    /// `None` while a detection is in flight; its result reschedules.
    pub fn next_deadline(&self, last_manual: Option<Instant>) -> Option<Instant> {
        if self.in_flight || self.pending.is_none() {
            return None;
        }
        let interval_open = self.last_detection.map(|t| t + self.settings.min_interval);
        let cooldown_open = last_manual.map(|t| t + self.settings.manual_change_cooldown);
        match (interval_open, cooldown_open) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Handle a scheduled wake-up; returns the text to send, if the gates are
    /// open now.
    pub fn on_deadline(&mut self, now: Instant, last_manual: Option<Instant>) -> Option<String> {
        self.try_issue(now, last_manual)
    }

    /// Handle a provider result.  Returns the catalog name to make the new
    /// source, or `None` if the result must not be applied.
    pub fn on_result(
        &mut self,
        result: Result<String, TranslateError>,
        now: Instant,
        last_manual: Option<Instant>,
        current: &SourceLanguage,
        catalog: &LanguageCatalog,
    ) -> Option<String> {
        self.in_flight = false;

        let code = match result {
            Ok(code) => code,
            Err(e) => {
                log::warn!("detect: provider failed: {e}");
                return None;
            }
        };
        let Some(name) = catalog.name_for_code(&code) else {
            log::debug!("detect: code '{code}' is not in the catalog");
            return None;
        };
        if !self.cooldown_open(now, last_manual) {
            log::debug!("detect: dropping '{name}', manual change is too recent");
            return None;
        }
        if current.name() == Some(name) {
            return None;
        }
        Some(name.to_string())
    }

    fn interval_open(&self, now: Instant) -> bool {
        self.last_detection
            .map_or(true, |t| now.saturating_duration_since(t) >= self.settings.min_interval)
    }

    fn cooldown_open(&self, now: Instant, last_manual: Option<Instant>) -> bool {
        last_manual.map_or(true, |t| {
            now.saturating_duration_since(t) >= self.settings.manual_change_cooldown
        })
    }

    fn try_issue(&mut self, now: Instant, last_manual: Option<Instant>) -> Option<String> {
        if self.in_flight || !self.interval_open(now) || !self.cooldown_open(now, last_manual) {
            return None;
        }
        let text = self.pending.take()?;
        self.in_flight = true;
        self.last_detection = Some(now);
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GOOGLE_LANGUAGES, GOOGLE_TTS_CODES};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const MS: Duration = Duration::from_millis(1);

    fn catalog() -> LanguageCatalog {
        LanguageCatalog::from_pairs(GOOGLE_LANGUAGES, GOOGLE_TTS_CODES)
    }

    fn detector() -> LanguageDetector {
        LanguageDetector::new(DetectorSettings::default())
    }

    #[test]
    fn noise_filter() {
        assert!(is_too_noisy("", 3, 0.5));
        assert!(is_too_noisy("ab", 3, 0.5));
        assert!(is_too_noisy("123456", 3, 0.5));
        assert!(is_too_noisy("!!?? 12", 3, 0.5));
        assert!(!is_too_noisy("abc", 3, 0.5));
        assert!(!is_too_noisy("hello world 42", 3, 0.5));
    }

    #[test]
    fn digits_never_trigger_detection() {
        let mut det = detector();
        let now = Instant::now();
        assert_eq!(
            det.on_text_changed("123456", now, None),
            DetectDecision::Skipped(SkipReason::TooNoisy)
        );
        assert_eq!(det.next_deadline(None), None);
        assert!(!det.in_flight());
    }

    #[test]
    fn first_edit_issues_immediately() {
        let mut det = detector();
        let now = Instant::now();
        assert_eq!(
            det.on_text_changed("bonjour", now, None),
            DetectDecision::Issue("bonjour".into())
        );
        assert!(det.in_flight());
    }

    #[test]
    fn edits_while_in_flight_keep_only_the_latest() {
        let mut det = detector();
        let t0 = Instant::now();
        det.on_text_changed("bonjour", t0, None);
        assert_eq!(det.on_text_changed("bonjour le", t0 + 100 * MS, None), DetectDecision::Deferred);
        assert_eq!(det.on_text_changed("bonjour le monde", t0 + 200 * MS, None), DetectDecision::Deferred);
        assert_eq!(det.next_deadline(None), None, "in flight: no deadline yet");

        det.on_result(Ok("fr".into()), t0 + 300 * MS, None, &SourceLanguage::Auto, &catalog());
        assert_eq!(det.next_deadline(None), Some(t0 + 1500 * MS));

        assert_eq!(det.on_deadline(t0 + 1499 * MS, None), None);
        assert_eq!(det.on_deadline(t0 + 1500 * MS, None), Some("bonjour le monde".into()));
    }

    #[test]
    fn noisy_edit_clears_pending() {
        let mut det = detector();
        let t0 = Instant::now();
        det.on_text_changed("bonjour", t0, None);
        det.on_text_changed("bonjour le", t0 + MS, None);
        det.on_text_changed("1", t0 + 2 * MS, None);
        assert_eq!(det.pending(), None);
    }

    #[test]
    fn manual_change_defers_until_cooldown() {
        let mut det = detector();
        let t0 = Instant::now();
        let manual = Some(t0);
        assert_eq!(det.on_text_changed("hello there", t0 + 500 * MS, manual), DetectDecision::Deferred);
        assert_eq!(det.next_deadline(manual), Some(t0 + 3000 * MS));
        assert_eq!(det.on_deadline(t0 + 3000 * MS, manual), Some("hello there".into()));
    }

    #[test]
    fn result_applies_only_when_different() {
        let catalog = catalog();
        let mut det = detector();
        let t0 = Instant::now();

        det.on_text_changed("bonjour", t0, None);
        let applied = det.on_result(Ok("fr".into()), t0, None, &SourceLanguage::named("french"), &catalog);
        assert_eq!(applied, None);

        det.on_text_changed("hola amigos", t0 + 2000 * MS, None);
        let applied = det.on_result(Ok("es".into()), t0 + 2000 * MS, None, &SourceLanguage::named("french"), &catalog);
        assert_eq!(applied, Some("spanish".into()));
    }

    #[test]
    fn manual_change_during_flight_wins() {
        let catalog = catalog();
        let mut det = detector();
        let t0 = Instant::now();
        det.on_text_changed("bonjour", t0, None);

        // User picks a language while the request is out.
        let manual = Some(t0 + 100 * MS);
        let applied = det.on_result(
            Ok("fr".into()),
            t0 + 200 * MS,
            manual,
            &SourceLanguage::named("german"),
            &catalog,
        );
        assert_eq!(applied, None);
        assert!(!det.in_flight());
    }

    #[test]
    fn failures_and_unknown_codes_are_swallowed() {
        let catalog = catalog();
        let mut det = detector();
        let t0 = Instant::now();

        det.on_text_changed("bonjour", t0, None);
        assert_eq!(
            det.on_result(Err(TranslateError::Timeout), t0, None, &SourceLanguage::Auto, &catalog),
            None
        );
        assert!(!det.in_flight());

        det.on_text_changed("bonjour", t0 + 2000 * MS, None);
        assert_eq!(
            det.on_result(Ok("xx".into()), t0 + 2000 * MS, None, &SourceLanguage::Auto, &catalog),
            None
        );
    }

    #[test]
    fn disabled_detector_never_issues() {
        let mut det = LanguageDetector::new(DetectorSettings {
            enabled: false,
            ..DetectorSettings::default()
        });
        assert_eq!(
            det.on_text_changed("bonjour", Instant::now(), None),
            DetectDecision::Skipped(SkipReason::Disabled)
        );
    }

    fn assert_cooldown(seed: u64, now: Instant, last_manual: Option<Instant>, settings: &DetectorSettings) {
        if let Some(manual) = last_manual {
            assert!(
                now - manual >= settings.manual_change_cooldown,
                "seed {seed}: acted {:?} after a manual change",
                now - manual
            );
        }
    }

    /// Drive the detector through random timelines and check that neither
    /// gate is ever violated and that at most one request is in flight.
    #[test]
    fn random_timelines_respect_interval_and_cooldown() {
        const TEXTS: &[&str] = &["bonjour", "hello there", "123", "hola", "x", "guten tag", "!!!"];
        const CODES: &[&str] = &["fr", "en", "es", "de", "xx"];

        let catalog = catalog();
        let settings = DetectorSettings::default();

        for seed in 1..=200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut det = LanguageDetector::new(settings.clone());
            let start = Instant::now();
            let mut now = start;
            let mut last_manual: Option<Instant> = None;
            let mut source = SourceLanguage::Auto;
            let mut issued: Vec<Instant> = Vec::new();
            let mut outstanding = 0u32;

            for _ in 0..300 {
                now += Duration::from_millis(rng.random_range(0..700));

                if let Some(deadline) = det.next_deadline(last_manual) {
                    if deadline <= now {
                        if det.on_deadline(now, last_manual).is_some() {
                            assert_cooldown(seed, now, last_manual, &settings);
                            issued.push(now);
                            outstanding += 1;
                        }
                    }
                }

                match rng.random_range(0..4) {
                    0 | 1 => {
                        let text = TEXTS[rng.random_range(0..TEXTS.len())];
                        if let DetectDecision::Issue(_) = det.on_text_changed(text, now, last_manual) {
                            assert_cooldown(seed, now, last_manual, &settings);
                            issued.push(now);
                            outstanding += 1;
                        }
                    }
                    2 => {
                        last_manual = Some(now);
                        source = SourceLanguage::named("german");
                    }
                    _ => {
                        if det.in_flight() {
                            let code = CODES[rng.random_range(0..CODES.len())];
                            outstanding -= 1;
                            if let Some(name) =
                                det.on_result(Ok(code.into()), now, last_manual, &source, &catalog)
                            {
                                assert_cooldown(seed, now, last_manual, &settings);
                                assert_ne!(source.name(), Some(name.as_str()));
                                source = SourceLanguage::named(&name);
                            }
                        }
                    }
                }

                assert!(outstanding <= 1, "seed {seed}: more than one detection in flight");
            }

            for pair in issued.windows(2) {
                assert!(
                    pair[1] - pair[0] >= settings.min_interval,
                    "seed {seed}: detections {:?} apart",
                    pair[1] - pair[0]
                );
            }
        }
    }
}
