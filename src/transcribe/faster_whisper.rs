use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use crate::config::TranscriberConfig;
use crate::error::Result;
use super::{TranscriptionProvider, ToolCommand};

/// Standalone faster-whisper executable run in batch mode over a folder
pub struct FasterWhisperTranscriber {
    config: TranscriberConfig,
}

impl FasterWhisperTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn build_command(&self, root: &Path) -> ToolCommand {
        let config = &self.config;

        ToolCommand::new(&config.binary_path, "Subtitle generation")
            .path(root)
            .option("--multilingual", config.multilingual.to_string())
            .option("--model", &config.model)
            .option("--output_dir", &config.output_dir)
            .flag_if(config.beep_off, "--beep_off")
            .flag_if(config.skip_existing, "--skip")
            .flag_if(config.print_progress, "--print_progress")
            .flag_if(config.batch_recursive, "--batch_recursive")
            .args(config.extra_args.iter().cloned())
    }
}

#[async_trait]
impl TranscriptionProvider for FasterWhisperTranscriber {
    async fn generate_subtitles(&self, root: &Path) -> Result<()> {
        info!("Generating subtitles with {} (model {}) for {}",
              self.config.binary_path, self.config.model, root.display());

        self.build_command(root).execute().await?;

        info!("Subtitle generation finished");
        Ok(())
    }
}
