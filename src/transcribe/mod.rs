// Transcription backends
//
// Subtitle generation is delegated to an external speech-to-text tool. Each
// backend turns the configuration into one blocking invocation over the whole
// folder; the tool writes `name.srt` files next to the videos itself.
//
// To add a backend, implement TranscriptionProvider and extend
// TranscriberKind plus the factory below.

pub mod command;
pub mod faster_whisper;

use async_trait::async_trait;
use std::path::Path;

pub use command::ToolCommand;
use crate::config::{TranscriberConfig, TranscriberKind};
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Write a subtitle file for every video under `root`
    async fn generate_subtitles(&self, root: &Path) -> Result<()>;
}

pub struct TranscriberFactory;

impl TranscriberFactory {
    /// `None` when transcription is disabled
    pub fn create_transcriber(config: TranscriberConfig) -> Option<Box<dyn TranscriptionProvider>> {
        match config.kind {
            TranscriberKind::FasterWhisper => {
                Some(Box::new(faster_whisper::FasterWhisperTranscriber::new(config)))
            }
            TranscriberKind::None => None,
        }
    }
}
