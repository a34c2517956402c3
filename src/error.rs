use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubforceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Directory traversal error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Malformed subtitle block {block}: {message}")]
    Subtitle { block: usize, message: String },

    #[error("Transcription error: {0}")]
    Transcriber(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SubforceError {
    pub(crate) fn subtitle(block: usize, message: impl Into<String>) -> Self {
        Self::Subtitle {
            block,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SubforceError>;
