//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every struct is `#[serde(default)]`, so a settings file only needs to name
//! the values it overrides.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Seconds from a settings file as a [`Duration`].
///
/// Negative and NaN values count as zero.  Values no `Duration` can hold,
/// such as `inf`, fall back to `default`.
fn secs_or(secs: f64, default: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_else(|_| Duration::from_secs_f64(default))
}

// ---------------------------------------------------------------------------
// TranslationBackend
// ---------------------------------------------------------------------------

/// Selects which service handles translation and language detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationBackend {
    /// The public Google Translate web endpoint (`client=gtx`).
    Google,
    /// Any LibreTranslate-compatible server (self-hosted or hosted).
    LibreTranslate,
}

impl Default for TranslationBackend {
    fn default() -> Self {
        Self::Google
    }
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Settings for the translation / detection provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Which backend to use.
    pub backend: TranslationBackend,
    /// Base URL of the API endpoint.
    ///
    /// - Google default: `https://translate.googleapis.com`
    /// - LibreTranslate: e.g. `http://localhost:5000`
    pub base_url: String,
    /// API key.  Only sent to LibreTranslate, and only when non-empty.
    pub api_key: Option<String>,
    /// Maximum seconds to wait for a provider response.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::default(),
            base_url: "https://translate.googleapis.com".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Settings for automatic source-language detection while typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Whether text edits trigger automatic detection at all.
    pub enabled: bool,
    /// Minimum seconds between two detection calls.
    pub min_interval_secs: f64,
    /// Seconds after a manual source-language change during which detection
    /// results are discarded.
    pub manual_change_cooldown_secs: f64,
    /// Inputs with fewer characters than this are never sent for detection.
    pub min_chars: usize,
    /// Inputs whose alphabetic-character ratio is below this are never sent.
    pub min_alpha_ratio: f32,
}

impl DetectionConfig {
    pub fn min_interval(&self) -> Duration {
        secs_or(self.min_interval_secs, Self::default().min_interval_secs)
    }

    pub fn manual_change_cooldown(&self) -> Duration {
        secs_or(
            self.manual_change_cooldown_secs,
            Self::default().manual_change_cooldown_secs,
        )
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_secs: 1.5,
            manual_change_cooldown_secs: 3.0,
            min_chars: 3,
            min_alpha_ratio: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for text-to-speech synthesis and playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Base URL of the Google TTS endpoint.
    pub base_url: String,
    /// Maximum seconds to wait for one synthesis chunk.
    pub timeout_secs: u64,
    /// Remove each temporary audio file as soon as its playback session ends.
    ///
    /// When `false` files are only removed at shutdown.
    pub delete_after_playback: bool,
    /// Language code used when the selected language has no TTS voice.
    pub fallback_language: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translate.google.com".into(),
            timeout_secs: 15,
            delete_after_playback: true,
            fallback_language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture and speech recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// GGML Whisper model name (file stem without the `ggml-` prefix).
    pub model: String,
    /// Seconds of ambient audio sampled to calibrate the energy threshold.
    pub calibration_secs: f32,
    /// Seconds to wait for speech to start before giving up.
    pub timeout_secs: f32,
    /// Hard cap on the length of one utterance, in seconds.
    pub phrase_limit_secs: f32,
    /// Seconds of trailing silence that end an utterance early.
    pub pause_secs: f32,
    /// Lowest RMS energy ever treated as speech, regardless of calibration.
    pub min_energy_threshold: f32,
    /// Language code used when the selected language cannot be recognized.
    pub fallback_language: String,
}

impl VoiceConfig {
    pub fn calibration(&self) -> Duration {
        secs_or(self.calibration_secs.into(), Self::default().calibration_secs.into())
    }

    pub fn timeout(&self) -> Duration {
        secs_or(self.timeout_secs.into(), Self::default().timeout_secs.into())
    }

    pub fn phrase_limit(&self) -> Duration {
        secs_or(self.phrase_limit_secs.into(), Self::default().phrase_limit_secs.into())
    }

    pub fn pause(&self) -> Duration {
        secs_or(self.pause_secs.into(), Self::default().pause_secs.into())
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            model: "base".into(),
            calibration_secs: 1.5,
            timeout_secs: 5.0,
            phrase_limit_secs: 8.0,
            pause_secs: 0.8,
            min_energy_threshold: 0.01,
            fallback_language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Front-end defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial source selection (`"auto"` or a language name).
    pub default_source: String,
    /// Initial destination language name.
    pub default_dest: String,
    /// Seconds a status notice stays visible before the line returns to idle.
    pub status_clear_secs: f64,
}

impl UiConfig {
    pub fn status_clear(&self) -> Duration {
        secs_or(self.status_clear_secs, Self::default().status_clear_secs)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_source: "english".into(),
            default_dest: "hindi".into(),
            status_clear_secs: 3.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_translator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Translation / detection provider settings.
    pub translation: TranslationConfig,
    /// Automatic language detection settings.
    pub detection: DetectionConfig,
    /// Text-to-speech settings.
    pub speech: SpeechConfig,
    /// Voice input settings.
    pub voice: VoiceConfig,
    /// Front-end defaults.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario).
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
