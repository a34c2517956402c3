use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::OllamaConfig;
use crate::error::{Result, SubforceError};
use super::{language_name, normalize_language_code, TranslationProvider};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranslationResult {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectionResult {
    language: String,
}

/// Detection and translation with a local Ollama model
pub struct OllamaTranslator {
    client: Client,
    config: OllamaConfig,
}

impl OllamaTranslator {
    pub fn new(client: Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            stream: false,
            format: "json".to_string(),
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        debug!("Sending generate request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubforceError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SubforceError::Translation(format!(
                "Ollama API error {}: {}", status, error_text
            )));
        }

        let generated: GenerateResponse = response.json().await
            .map_err(|e| SubforceError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw_response = generated.response.trim().to_string();
        debug!("Raw Ollama response: {}", raw_response);

        if raw_response.is_empty() {
            return Err(SubforceError::Translation("Empty response received".to_string()));
        }
        Ok(raw_response)
    }
}

pub fn build_detection_prompt(text: &str) -> String {
    format!(
        "You are a language identification system.\n\
         \n\
         Identify the language of the text below and return ONLY its ISO 639-1 code \
         in JSON format as {{\"language\":\"xx\"}}.\n\
         \n\
         Text: \"{}\"\n",
        text
    )
}

pub fn build_translation_prompt(text: &str, source: &str, target: &str) -> String {
    let target_name = language_name(target);
    let source_line = if source == "auto" {
        "Detect the source language yourself.".to_string()
    } else {
        format!("The source language is {}.", language_name(source))
    };

    format!(
        "You are a professional subtitle translator.\n\
         \n\
         Translate the text to {} ONLY. {}\n\
         If the text is already in {}, return it unchanged.\n\
         \n\
         Return ONLY the translation in JSON format as {{\"text\":\"your {} translation here\"}}.\n\
         Do not include any explanations or alternatives. Keep line breaks.\n\
         \n\
         [Text to translate]\n\
         {}\n",
        target_name, source_line, target_name, target_name, text
    )
}

/// Accept `{"language":"fr"}` or a bare code
pub fn parse_detection(raw: &str) -> Result<String> {
    if let Ok(result) = serde_json::from_str::<DetectionResult>(raw) {
        return Ok(normalize_language_code(&result.language));
    }

    let candidate = raw.trim().trim_matches('"');
    if (2..=3).contains(&candidate.len()) && candidate.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(candidate.to_lowercase());
    }

    Err(SubforceError::Translation(format!("Unrecognized detection response: {}", raw)))
}

/// Accept `{"text":"..."}`, falling back to the non-JSON lines of the answer
pub fn parse_translation(raw: &str) -> Result<String> {
    let text = match serde_json::from_str::<TranslationResult>(raw) {
        Ok(result) => result.text.trim().to_string(),
        Err(_) => raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('{'))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    if text.is_empty() {
        return Err(SubforceError::Translation(format!("Empty translation in response: {}", raw)));
    }
    Ok(text)
}

#[async_trait]
impl TranslationProvider for OllamaTranslator {
    async fn detect(&self, text: &str) -> Result<String> {
        let raw = self.generate(build_detection_prompt(text)).await?;
        parse_detection(&raw)
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let raw = self.generate(build_translation_prompt(text, source, target)).await?;
        parse_translation(&raw)
    }

    /// The model must already be pulled
    async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.config.endpoint);

        let response = self.client
            .post(&url)
            .json(&json!({ "name": self.config.model }))
            .send()
            .await
            .map_err(|e| SubforceError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

        if response.status().is_success() {
            info!("Ollama model '{}' is available", self.config.model);
            Ok(())
        } else {
            Err(SubforceError::Translation(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.model, self.config.model
            )))
        }
    }
}
