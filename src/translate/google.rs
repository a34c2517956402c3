use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::GoogleConfig;
use crate::error::{Result, SubforceError};
use super::TranslationProvider;

/// Translation through the public `translate_a/single` web endpoint
pub struct GoogleTranslator {
    client: Client,
    config: GoogleConfig,
}

/// Useful parts of the endpoint's nested-array answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleAnswer {
    pub text: String,
    pub detected_language: Option<String>,
}

impl GoogleTranslator {
    pub fn new(client: Client, config: GoogleConfig) -> Self {
        Self { client, config }
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> Result<GoogleAnswer> {
        let url = format!("{}/translate_a/single", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| SubforceError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubforceError::Translation(format!(
                "Google Translate error {}: {}", status, error_text
            )));
        }

        let body: Value = response.json().await
            .map_err(|e| SubforceError::Translation(format!("Failed to parse response: {}", e)))?;

        parse_answer(&body)
    }
}

/// Decode `[[["translated","original",...],...],null,"fr",...]`
pub fn parse_answer(body: &Value) -> Result<GoogleAnswer> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| SubforceError::Translation("Unexpected response shape".to_string()))?;

    let text: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect();

    let detected_language = body
        .get(2)
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(GoogleAnswer { text, detected_language })
}

#[async_trait]
impl TranslationProvider for GoogleTranslator {
    async fn detect(&self, text: &str) -> Result<String> {
        let answer = self.request(text, "auto", "en").await?;
        answer
            .detected_language
            .ok_or_else(|| SubforceError::Translation("No language detected".to_string()))
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let answer = self.request(text, source, target).await?;
        if answer.text.trim().is_empty() && !text.trim().is_empty() {
            return Err(SubforceError::Translation("Empty translation received".to_string()));
        }
        Ok(answer.text)
    }
}
