//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-translator\
//!   macOS:   ~/Library/Application Support/voice-translator/
//!   Linux:   ~/.config/voice-translator/
//!
//! Data dir (Whisper models):
//!   Windows: %LOCALAPPDATA%\voice-translator\
//!   macOS:   ~/Library/Application Support/voice-translator/
//!   Linux:   ~/.local/share/voice-translator/
//!
//! Synthesized speech is written to the system temp directory, not here.

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML recognition models.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "voice-translator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }

    /// Full path of the GGML model file named `model` (file stem).
    pub fn model_file(&self, model: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{model}.bin"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
