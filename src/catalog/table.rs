//! [`LanguageCatalog`] — the immutable name/code table plus the TTS and
//! recognition capability sets derived from it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

use crate::catalog::languages::{FALLBACK_LANGUAGES, FALLBACK_TTS_CODES, RECOGNITION_CODES};
use crate::translate::Translator;
use crate::tts::SpeechSynthesizer;

/// Code the translation provider accepts for "detect the source for me".
pub const AUTO_CODE: &str = "auto";

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No entry matches the given name.
    #[error("unknown language '{0}'")]
    NotFound(String),

    /// `Auto` was used where a concrete language is required.
    #[error("'Auto' can only be used as the source language")]
    AutoNotAllowed,
}

// ---------------------------------------------------------------------------
// SourceLanguage
// ---------------------------------------------------------------------------

/// The source-language selector: either auto-detect or a catalog name.
///
/// Names are stored lowercase so comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    Auto,
    Named(String),
}

impl SourceLanguage {
    /// Parse user input; `"auto"` in any case selects auto-detect.
    ///
    /// ```
    /// use voice_translator::catalog::SourceLanguage;
    ///
    /// assert_eq!(SourceLanguage::parse("AUTO"), SourceLanguage::Auto);
    /// assert_eq!(SourceLanguage::parse(" French "), SourceLanguage::named("french"));
    /// ```
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case(AUTO_CODE) {
            Self::Auto
        } else {
            Self::named(trimmed)
        }
    }

    pub fn named(name: &str) -> Self {
        Self::Named(name.trim().to_lowercase())
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    /// The concrete name, or `None` for `Auto`.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Auto => None,
            Self::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Named(name) => f.write_str(&display_name(name)),
        }
    }
}

/// Title-case a canonical (lowercase) name for display: `"haitian creole"`
/// becomes `"Haitian Creole"`.
pub fn display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for ch in name.chars() {
        if at_word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.push(ch);
            if !ch.is_alphanumeric() {
                at_word_start = true;
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// LanguageEntry / CatalogStatus
// ---------------------------------------------------------------------------

/// One row of the catalog.  Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEntry {
    /// Lowercase canonical name, e.g. `"english"`.
    pub name: String,
    /// Provider language code, e.g. `"en"`.
    pub code: String,
    pub tts_capable: bool,
    pub recognition_capable: bool,
}

/// How the catalog was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    /// Both provider lists loaded.
    Complete,
    /// At least one list could not be loaded and a built-in table was used.
    Degraded { reason: String },
}

impl CatalogStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

// ---------------------------------------------------------------------------
// LanguageCatalog
// ---------------------------------------------------------------------------

/// Canonical language table with derived capability sets.
///
/// The three capability checks (translation, TTS, recognition) are
/// independent: a code can be translatable without being speakable, and
/// speakable without being recognizable.
#[derive(Debug, Clone)]
pub struct LanguageCatalog {
    entries: Vec<LanguageEntry>,
    by_name: HashMap<String, usize>,
    by_code: HashMap<String, usize>,
    tts_codes: BTreeSet<String>,
}

impl LanguageCatalog {
    /// Build a catalog from a name → code mapping and a TTS code set.
    pub fn new(languages: BTreeMap<String, String>, tts_codes: BTreeSet<String>) -> Self {
        let mut entries = Vec::with_capacity(languages.len());
        let mut by_name = HashMap::with_capacity(languages.len());
        let mut by_code = HashMap::with_capacity(languages.len());

        for (name, code) in languages {
            let name = name.trim().to_lowercase();
            if name.is_empty() || code.is_empty() || by_name.contains_key(&name) {
                continue;
            }
            let idx = entries.len();
            by_name.insert(name.clone(), idx);
            by_code.entry(code.to_lowercase()).or_insert(idx);
            entries.push(LanguageEntry {
                tts_capable: tts_codes.contains(&code),
                recognition_capable: RECOGNITION_CODES.contains(&code.as_str()),
                name,
                code,
            });
        }

        Self {
            entries,
            by_name,
            by_code,
            tts_codes,
        }
    }

    /// Build a catalog from static `(name, code)` pairs.
    pub fn from_pairs(languages: &[(&str, &str)], tts_codes: &[&str]) -> Self {
        Self::new(
            languages
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
            tts_codes.iter().map(|c| c.to_string()).collect(),
        )
    }

    /// Minimal two-language table used when loading fails.
    pub fn fallback() -> Self {
        Self::from_pairs(FALLBACK_LANGUAGES, FALLBACK_TTS_CODES)
    }

    /// Load from the providers, degrading to built-in tables on failure.
    ///
    /// A translation-list failure replaces the whole catalog with the
    /// fallback; a TTS-list failure keeps the translation table and uses the
    /// fallback TTS set.  Either way the returned status says so.
    pub async fn load(
        translator: &dyn Translator,
        synthesizer: &dyn SpeechSynthesizer,
    ) -> (Self, CatalogStatus) {
        let languages = match translator.supported_languages().await {
            Ok(languages) if !languages.is_empty() => languages,
            Ok(_) => {
                log::warn!("catalog: provider returned no languages; using fallback table");
                return (
                    Self::fallback(),
                    CatalogStatus::Degraded {
                        reason: "translation provider reported no languages".into(),
                    },
                );
            }
            Err(e) => {
                log::warn!("catalog: failed to load languages ({e}); using fallback table");
                return (
                    Self::fallback(),
                    CatalogStatus::Degraded {
                        reason: format!("failed to load languages: {e}"),
                    },
                );
            }
        };

        match synthesizer.supported_languages().await {
            Ok(tts) => (Self::new(languages, tts), CatalogStatus::Complete),
            Err(e) => {
                log::warn!("catalog: failed to load TTS languages ({e}); using fallback set");
                let tts = FALLBACK_TTS_CODES.iter().map(|c| c.to_string()).collect();
                (
                    Self::new(languages, tts),
                    CatalogStatus::Degraded {
                        reason: format!("failed to load speech languages: {e}"),
                    },
                )
            }
        }
    }

    /// Resolve a language name to its code.  Case-insensitive.
    ///
    /// ```
    /// use voice_translator::catalog::LanguageCatalog;
    ///
    /// let catalog = LanguageCatalog::fallback();
    /// assert_eq!(catalog.resolve_code("Hindi").unwrap(), "hi");
    /// assert!(catalog.resolve_code("klingon").is_err());
    /// ```
    pub fn resolve_code(&self, name: &str) -> Result<&str, CatalogError> {
        let key = name.trim().to_lowercase();
        if key == AUTO_CODE {
            return Err(CatalogError::AutoNotAllowed);
        }
        self.by_name
            .get(&key)
            .map(|&idx| self.entries[idx].code.as_str())
            .ok_or_else(|| CatalogError::NotFound(name.trim().to_string()))
    }

    /// Resolve a source selector; `Auto` maps to [`AUTO_CODE`].
    pub fn resolve_source(&self, source: &SourceLanguage) -> Result<&str, CatalogError> {
        match source {
            SourceLanguage::Auto => Ok(AUTO_CODE),
            SourceLanguage::Named(name) => self.resolve_code(name),
        }
    }

    /// Canonical name for a provider code, e.g. `"fr"` → `"french"`.
    pub fn name_for_code(&self, code: &str) -> Option<&str> {
        self.by_code
            .get(&code.trim().to_lowercase())
            .map(|&idx| self.entries[idx].name.as_str())
    }

    /// Canonical name for user input that is either a name or a code.
    pub fn canonical_name(&self, input: &str) -> Result<&str, CatalogError> {
        let key = input.trim().to_lowercase();
        if key == AUTO_CODE {
            return Err(CatalogError::AutoNotAllowed);
        }
        if let Some(&idx) = self.by_name.get(&key) {
            return Ok(self.entries[idx].name.as_str());
        }
        self.name_for_code(&key)
            .ok_or_else(|| CatalogError::NotFound(input.trim().to_string()))
    }

    pub fn is_tts_capable(&self, code: &str) -> bool {
        self.tts_codes.contains(code)
    }

    pub fn is_recognition_capable(&self, code: &str) -> bool {
        RECOGNITION_CODES.contains(&code)
    }

    pub fn entry(&self, name: &str) -> Option<&LanguageEntry> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&idx| &self.entries[idx])
    }

    /// All entries, sorted by canonical name.
    pub fn entries(&self) -> &[LanguageEntry] {
        &self.entries
    }

    /// Sorted canonical names, as offered by the language selectors.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
