use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SubforceError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub discovery: DiscoveryConfig,
    pub cli: CliConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Which transcription backend to run before translating
    pub kind: TranscriberKind,
    /// Path to the transcriber binary (e.g., faster-whisper-xxl)
    pub binary_path: String,
    /// Model size passed as `--model`
    pub model: String,
    /// Detect the spoken language per segment
    pub multilingual: bool,
    /// Value passed as `--output_dir`
    pub output_dir: String,
    /// Silence the beep the tool plays when it finishes
    pub beep_off: bool,
    /// Skip videos that already have a transcript
    pub skip_existing: bool,
    /// Let the tool print its own progress
    pub print_progress: bool,
    /// Walk the directory recursively
    pub batch_recursive: bool,
    /// Extra arguments appended after the fixed ones
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriberKind {
    /// faster-whisper standalone executable (Purfview build)
    FasterWhisper,
    /// Do not generate transcripts; only translate existing ones
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Translation backend
    pub backend: TranslationBackend,
    /// Language every caption is normalized to
    pub target_language: String,
    /// Attempts per provider call before giving up on a caption
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each further retry
    pub retry_backoff_ms: u64,
    /// Timeout applied to every detect/translate call
    pub request_timeout_secs: u64,
    /// Captions translated concurrently within one file
    pub concurrency: usize,
    /// What to do with a caption whose provider calls keep failing
    pub on_failure: FailurePolicy,
    /// Draw a progress bar per subtitle file
    pub show_progress: bool,
    pub google: GoogleConfig,
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationBackend {
    /// Public Google Translate web endpoint
    Google,
    /// Local Ollama server
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Finish the other captions, then fail the file and report every failed index
    Skip,
    /// Fail the file at the first failing caption
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for detection and translation
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Lowercase video extensions, without the dot
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Re-prompts allowed after an invalid folder before giving up
    pub max_prompt_attempts: u32,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            kind: TranscriberKind::FasterWhisper,
            binary_path: "faster-whisper/faster-whisper-xxl".to_string(),
            model: "medium".to_string(),
            multilingual: true,
            output_dir: "source".to_string(),
            beep_off: true,
            skip_existing: true,
            print_progress: true,
            batch_recursive: true,
            extra_args: Vec::new(),
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::Google,
            target_language: "en".to_string(),
            max_attempts: 3,
            retry_backoff_ms: 1000,
            request_timeout_secs: 30,
            concurrency: 1,
            on_failure: FailurePolicy::Skip,
            show_progress: true,
            google: GoogleConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.googleapis.com".to_string(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: ["mp4", "avi", "mkv", "mov", "flv", "wmv", "mpeg", "webm"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { max_prompt_attempts: 5 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubforceError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubforceError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubforceError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubforceError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject values that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.translate.target_language.trim().is_empty() {
            return Err(SubforceError::Config("translate.target_language must not be empty".to_string()));
        }
        if self.translate.max_attempts == 0 {
            return Err(SubforceError::Config("translate.max_attempts must be at least 1".to_string()));
        }
        if self.translate.concurrency == 0 {
            return Err(SubforceError::Config("translate.concurrency must be at least 1".to_string()));
        }
        if self.discovery.extensions.is_empty() {
            return Err(SubforceError::Config("discovery.extensions must not be empty".to_string()));
        }
        Ok(())
    }
}
