//! [`GoogleTranslator`] — the public Google Translate web endpoint.
//!
//! Uses `GET /translate_a/single?client=gtx`, which answers with nested JSON
//! arrays: element `[0]` holds the translated segments (each `[translated,
//! original, …]`) and element `[2]` the detected source code.  The endpoint
//! has no language-list call, so the supported set is the built-in Google
//! table.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::GOOGLE_LANGUAGES;
use crate::config::TranslationConfig;
use crate::translate::provider::{SourceCode, TranslateError, Translator};

pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    /// Build a translator from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &TranslationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn query(&self, text: &str, source: &str, target: &str) -> Result<Value, TranslateError> {
        let url = format!("{}/translate_a/single", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;

        response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))
    }
}

/// Concatenate the translated segments of a `translate_a/single` response.
fn translated_text(json: &Value) -> Result<String, TranslateError> {
    let segments = json
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Parse("missing translation segments".into()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(TranslateError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &SourceCode,
        target: &str,
    ) -> Result<String, TranslateError> {
        let json = self.query(text, source.as_str(), target).await?;
        translated_text(&json)
    }

    async fn detect_language(&self, text: &str) -> Result<String, TranslateError> {
        let json = self.query(text, "auto", "en").await?;
        json.get(2)
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .ok_or(TranslateError::EmptyResponse)
    }

    async fn supported_languages(&self) -> Result<BTreeMap<String, String>, TranslateError> {
        Ok(GOOGLE_LANGUAGES
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn translator_for(server: &mockito::ServerGuard) -> GoogleTranslator {
        GoogleTranslator::from_config(&TranslationConfig {
            base_url: server.url(),
            ..TranslationConfig::default()
        })
    }

    #[test]
    fn joins_multiple_segments() {
        let json: Value = serde_json::json!([
            [["Bonjour. ", "Hello. ", null], ["Au revoir.", "Goodbye.", null]],
            null,
            "en"
        ]);
        assert_eq!(translated_text(&json).unwrap(), "Bonjour. Au revoir.");
    }

    #[test]
    fn blank_segments_are_an_empty_response() {
        let json: Value = serde_json::json!([[["  ", "x", null]], null, "en"]);
        assert_eq!(translated_text(&json), Err(TranslateError::EmptyResponse));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let json: Value = serde_json::json!({"error": "nope"});
        assert!(matches!(translated_text(&json), Err(TranslateError::Parse(_))));
    }

    #[tokio::test]
    async fn translate_sends_codes_and_reads_segments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/translate_a/single")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client".into(), "gtx".into()),
                Matcher::UrlEncoded("sl".into(), "auto".into()),
                Matcher::UrlEncoded("tl".into(), "hi".into()),
                Matcher::UrlEncoded("q".into(), "hello".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"[[["नमस्ते","hello",null,null,10]],null,"en"]"#)
            .create_async()
            .await;

        let translator = translator_for(&server);
        let out = translator
            .translate("hello", &SourceCode::Auto, "hi")
            .await
            .unwrap();

        assert_eq!(out, "नमस्ते");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn detect_reads_source_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/translate_a/single")
            .match_query(Matcher::UrlEncoded("sl".into(), "auto".into()))
            .with_header("content-type", "application/json")
            .with_body(r#"[[["Hello","Bonjour",null]],null,"fr"]"#)
            .create_async()
            .await;

        let translator = translator_for(&server);
        assert_eq!(translator.detect_language("Bonjour").await.unwrap(), "fr");
    }

    #[tokio::test]
    async fn server_error_is_a_request_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/translate_a/single")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let translator = translator_for(&server);
        let err = translator
            .translate("hello", &SourceCode::Code("en".into()), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Request(_)));
    }

    #[tokio::test]
    async fn supported_languages_is_the_builtin_table() {
        let translator = GoogleTranslator::from_config(&TranslationConfig::default());
        let langs = translator.supported_languages().await.unwrap();
        assert_eq!(langs.get("english").map(String::as_str), Some("en"));
        assert_eq!(langs.len(), GOOGLE_LANGUAGES.len());
    }
}
