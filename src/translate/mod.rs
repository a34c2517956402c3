// Translation backends
//
// The caption filter only needs two operations from a translation service:
// detect the language of a short text, and translate it. Backends:
// - Google: public web endpoint, detection comes back with the translation
// - Ollama: local LLM prompted for JSON answers

pub mod google;
pub mod language;
pub mod ollama;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub use language::{is_same_language, language_name, normalize_language_code};
use crate::config::{TranslateConfig, TranslationBackend};
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Best-guess language code of `text`
    async fn detect(&self, text: &str) -> Result<String>;

    /// Translate `text` from `source` ("auto" to let the service decide) into `target`
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Fail early when the backend cannot serve requests at all
    async fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

pub struct TranslatorFactory;

impl TranslatorFactory {
    pub fn create_translator(config: &TranslateConfig) -> Result<Box<dyn TranslationProvider>> {
        let client = Client::builder()
            .user_agent(concat!("subforce/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let translator: Box<dyn TranslationProvider> = match config.backend {
            TranslationBackend::Google => {
                Box::new(google::GoogleTranslator::new(client, config.google.clone()))
            }
            TranslationBackend::Ollama => {
                Box::new(ollama::OllamaTranslator::new(client, config.ollama.clone()))
            }
        };
        Ok(translator)
    }
}
