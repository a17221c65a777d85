//! Whisper decoding parameters and language-code mapping.
//!
//! [`TranscribeParams`] carries the settings shared by every recognition run.
//! The language is not part of it: each call to
//! [`SpeechRecognizer::recognize`](crate::stt::SpeechRecognizer::recognize)
//! names its own, mapped through [`whisper_language`].

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
///
/// Greedy decoding is the default; short phrases gain little from beam
/// search.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    Greedy {
        best_of: i32,
    },
    BeamSearch {
        beam_size: i32,
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TranscribeParams {
    pub strategy: SamplingStrategy,

    /// CPU threads handed to Whisper.  Defaults to [`optimal_threads()`].
    pub n_threads: i32,

    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
        }
    }
}

/// Number of CPU threads to use for inference, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

/// Map a catalog code to the code Whisper expects.
///
/// Whisper uses bare ISO-639-1 codes, so regional variants lose their
/// suffix: `"zh-CN"` becomes `"zh"`.
///
/// ```
/// use voice_translator::stt::whisper_language;
///
/// assert_eq!(whisper_language("zh-CN"), "zh");
/// assert_eq!(whisper_language("fr"), "fr");
/// ```
pub fn whisper_language(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// `true` if Whisper output carries no speech: empty, or only bracketed
/// annotations such as `[BLANK_AUDIO]` or `(music)`.
pub(crate) fn is_non_speech(text: &str) -> bool {
    let mut rest = text.trim();
    while !rest.is_empty() {
        let close = match rest.chars().next() {
            Some('[') => ']',
            Some('(') => ')',
            Some('*') => '*',
            _ => return false,
        };
        match rest[1..].find(close) {
            Some(end) => rest = rest[end + 2..].trim_start(),
            None => return false,
        }
    }
    true
}
