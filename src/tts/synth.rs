//! [`SpeechSynthesizer`] trait and the Google `translate_tts` provider.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::GOOGLE_TTS_CODES;
use crate::config::SpeechConfig;

/// The endpoint rejects longer `q` values.
pub const MAX_CHUNK_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    /// HTTP transport or connection error, or a non-success status.
    #[error("speech request failed: {0}")]
    Request(String),

    #[error("speech request timed out")]
    Timeout,

    /// The provider answered with no audio.
    #[error("speech service returned no audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` in language `code`, returning MP3 bytes.
    async fn synthesize(&self, text: &str, code: &str) -> Result<Vec<u8>, SynthesisError>;

    /// Codes this provider can speak.
    async fn supported_languages(&self) -> Result<BTreeSet<String>, SynthesisError>;
}

// ---------------------------------------------------------------------------
// Text chunking
// ---------------------------------------------------------------------------

/// Split `text` into pieces of at most `max` characters, breaking between
/// words where possible.  Words longer than `max` are split mid-word.
///
/// ```
/// use voice_translator::tts::split_chunks;
///
/// assert_eq!(split_chunks("one two three", 7), vec!["one two", "three"]);
/// ```
pub fn split_chunks(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ---------------------------------------------------------------------------
// GoogleTts
// ---------------------------------------------------------------------------

pub struct GoogleTts {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTts {
    pub fn from_config(config: &SpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, code: &str) -> Result<Vec<u8>, SynthesisError> {
        let chunks = split_chunks(text, MAX_CHUNK_CHARS);
        let total = chunks.len().to_string();
        let url = format!("{}/translate_tts", self.base_url);
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let bytes = self
                .client
                .get(&url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", code),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }
        log::debug!(
            "tts: {} chunk(s), {} bytes for '{code}'",
            chunks.len(),
            audio.len()
        );
        Ok(audio)
    }

    async fn supported_languages(&self) -> Result<BTreeSet<String>, SynthesisError> {
        Ok(GOOGLE_TTS_CODES.iter().map(|c| c.to_string()).collect())
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer (test-only)
// ---------------------------------------------------------------------------

/// Records every request and answers with a few fake bytes.
///
/// With a gate, each call waits for a permit, so tests decide when synthesis
/// finishes.
#[cfg(test)]
pub struct MockSynthesizer {
    pub calls: std::sync::Mutex<Vec<(String, String)>>,
    failure: Option<SynthesisError>,
    gate: Option<std::sync::Arc<tokio::sync::Semaphore>>,
}

#[cfg(test)]
impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            failure: None,
            gate: None,
        }
    }

    pub fn failing(error: SynthesisError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    pub fn gated(mut self, gate: std::sync::Arc<tokio::sync::Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, code: &str) -> Result<Vec<u8>, SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), code.to_string()));
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(b"ID3fake-mp3".to_vec()),
        }
    }

    async fn supported_languages(&self) -> Result<BTreeSet<String>, SynthesisError> {
        Ok(GOOGLE_TTS_CODES.iter().map(|c| c.to_string()).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_chunks("  hello   world ", 100), vec!["hello world"]);
        assert!(split_chunks("   ", 100).is_empty());
    }

    #[test]
    fn chunks_respect_limit() {
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let chunks = split_chunks(&text, MAX_CHUNK_CHARS);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn long_word_is_split() {
        let word = "a".repeat(250);
        let chunks = split_chunks(&format!("hi {word} yo"), 100);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0], "hi");
        assert_eq!(chunks[3].len(), 50);
        assert_eq!(chunks[4], "yo");
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "नमस्ते ".repeat(30);
        for chunk in split_chunks(&text, 100) {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[tokio::test]
    async fn synthesize_concatenates_chunks() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("tl".into(), "hi".into()),
                Matcher::UrlEncoded("idx".into(), "0".into()),
                Matcher::UrlEncoded("total".into(), "2".into()),
            ]))
            .with_body("AAA")
            .create_async()
            .await;
        let second = server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("tl".into(), "hi".into()),
                Matcher::UrlEncoded("idx".into(), "1".into()),
            ]))
            .with_body("BB")
            .create_async()
            .await;

        let tts = GoogleTts::from_config(&SpeechConfig {
            base_url: server.url(),
            ..SpeechConfig::default()
        });
        let text = format!("{} {}", "x".repeat(90), "y".repeat(20));
        let audio = tts.synthesize(&text, "hi").await.unwrap();

        assert_eq!(audio, b"AAABB");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::Any)
            .with_body("")
            .create_async()
            .await;

        let tts = GoogleTts::from_config(&SpeechConfig {
            base_url: server.url(),
            ..SpeechConfig::default()
        });
        assert_eq!(
            tts.synthesize("hello", "en").await,
            Err(SynthesisError::EmptyAudio)
        );
    }

    #[tokio::test]
    async fn http_error_is_a_request_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let tts = GoogleTts::from_config(&SpeechConfig {
            base_url: server.url(),
            ..SpeechConfig::default()
        });
        assert!(matches!(
            tts.synthesize("hello", "en").await,
            Err(SynthesisError::Request(_))
        ));
    }
}
