//! Language catalog — canonical name/code table and capability sets.
//!
//! * [`LanguageCatalog`] — immutable table, loaded once at startup from the
//!   translation and TTS providers (or the built-in fallback).
//! * [`SourceLanguage`] — source selector, `Auto` or a named language.
//! * [`CatalogStatus`] — whether the fallback had to be used.

pub mod languages;
pub mod table;

pub use languages::{GOOGLE_LANGUAGES, GOOGLE_TTS_CODES, RECOGNITION_CODES};
pub use table::{
    display_name, CatalogError, CatalogStatus, LanguageCatalog, LanguageEntry, SourceLanguage,
    AUTO_CODE,
};
