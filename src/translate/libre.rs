//! [`LibreTranslator`] — any LibreTranslate-compatible server.
//!
//! Endpoints used: `POST /translate`, `POST /detect`, `GET /languages`.
//! The API key is attached only when configured and non-empty, so local
//! servers without authentication work unchanged.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TranslationConfig;
use crate::translate::provider::{SourceCode, TranslateError, Translator};

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct Detection {
    language: String,
    #[serde(default)]
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    code: String,
    name: String,
}

pub struct LibreTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LibreTranslator {
    pub fn from_config(config: &TranslationConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn body(&self, mut body: serde_json::Value) -> serde_json::Value {
        if let Some(key) = &self.api_key {
            body["api_key"] = serde_json::Value::String(key.clone());
        }
        body
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, TranslateError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.body(body))
            .send()
            .await?
            .error_for_status()?;

        response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &SourceCode,
        target: &str,
    ) -> Result<String, TranslateError> {
        let response: TranslateResponse = self
            .post(
                "/translate",
                serde_json::json!({
                    "q":      text,
                    "source": source.as_str(),
                    "target": target,
                    "format": "text"
                }),
            )
            .await?;

        if response.translated_text.trim().is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        Ok(response.translated_text)
    }

    async fn detect_language(&self, text: &str) -> Result<String, TranslateError> {
        let detections: Vec<Detection> = self
            .post("/detect", serde_json::json!({ "q": text }))
            .await?;

        detections
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|d| d.language)
            .filter(|code| !code.is_empty())
            .ok_or(TranslateError::EmptyResponse)
    }

    async fn supported_languages(&self) -> Result<BTreeMap<String, String>, TranslateError> {
        let url = format!("{}/languages", self.base_url);
        let languages: Vec<LanguageInfo> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;

        Ok(languages
            .into_iter()
            .map(|l| (l.name.to_lowercase(), l.code))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
