use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::discovery::{discover_videos, VideoFile};
use crate::error::{Result, SubforceError};
use crate::forced::{CaptionFilter, FilterReport, FilterSettings};
use crate::transcribe::{TranscriberFactory, TranscriptionProvider};
use crate::translate::{TranslationProvider, TranslatorFactory};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_INVALID_INPUT: u8 = 1;
pub const EXIT_EXTERNAL_TOOL: u8 = 2;
pub const EXIT_FILE_ERRORS: u8 = 3;

/// What the orchestrator did with one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    /// No `name.srt` next to the video
    SubtitleMissing,
    /// The forced subtitle already exists and was left alone
    AlreadyProcessed,
    Translated(FilterReport),
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub transcription_failed: bool,
    pub videos: usize,
    pub processed: usize,
    pub missing_subtitle: usize,
    pub already_processed: usize,
    /// Videos whose subtitle could not be processed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl RunSummary {
    fn record(&mut self, outcome: &VideoOutcome) {
        match outcome {
            VideoOutcome::SubtitleMissing => self.missing_subtitle += 1,
            VideoOutcome::AlreadyProcessed => self.already_processed += 1,
            VideoOutcome::Translated(_) => self.processed += 1,
        }
    }

    /// Transcription failure outranks per-file failures
    pub fn exit_code(&self) -> u8 {
        if self.transcription_failed {
            EXIT_EXTERNAL_TOOL
        } else if !self.failed.is_empty() {
            EXIT_FILE_ERRORS
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Exit code for an error that ended the run early
pub fn exit_code_for(error: &SubforceError) -> u8 {
    match error {
        SubforceError::InvalidInput(_) | SubforceError::Config(_) | SubforceError::Toml(_) => EXIT_INVALID_INPUT,
        SubforceError::Transcriber(_)
        | SubforceError::Translation(_)
        | SubforceError::Http(_)
        | SubforceError::Timeout(_) => EXIT_EXTERNAL_TOOL,
        _ => EXIT_FILE_ERRORS,
    }
}

pub struct Workflow {
    config: Config,
    transcriber: Option<Box<dyn TranscriptionProvider>>,
    translator: Box<dyn TranslationProvider>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone());
        let translator = TranslatorFactory::create_translator(&config.translate)?;

        Ok(Self::with_providers(config, transcriber, translator))
    }

    pub fn with_providers(
        config: Config,
        transcriber: Option<Box<dyn TranscriptionProvider>>,
        translator: Box<dyn TranslationProvider>,
    ) -> Self {
        Self {
            config,
            transcriber,
            translator,
        }
    }

    /// Generate transcripts for the whole folder, then write a forced
    /// subtitle for every video that has a transcript but no forced file yet.
    pub async fn run<P: AsRef<Path>>(&self, root: P) -> Result<RunSummary> {
        let root = std::fs::canonicalize(root.as_ref())?;
        info!("Processing folder: {}", root.display());

        let mut summary = RunSummary {
            transcription_failed: !self.generate_subtitles(&root).await,
            ..RunSummary::default()
        };

        self.translator.check_availability().await?;

        let videos = discover_videos(&root, &self.config.discovery.extensions)?;
        summary.videos = videos.len();
        info!("Found {} video files to process", videos.len());

        for path in videos {
            let relative = pathdiff::diff_paths(&path, &root).unwrap_or_else(|| path.clone());
            debug!("Checking {}", relative.display());

            let video = VideoFile::new(path, &self.config.translate.target_language);
            match self.process_video(&video).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    warn!("- {} - Failed to process {}: {}", video.display_name(), relative.display(), e);
                    summary.failed.push((video.path, e.to_string()));
                }
            }
        }

        info!(
            "Done: {} videos, {} translated, {} without .srt, {} already done, {} failed",
            summary.videos,
            summary.processed,
            summary.missing_subtitle,
            summary.already_processed,
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Returns false when the transcription tool failed; the run goes on
    /// with whatever subtitles already exist.
    async fn generate_subtitles(&self, root: &Path) -> bool {
        let Some(transcriber) = &self.transcriber else {
            info!("Transcription disabled, using existing subtitle files");
            return true;
        };

        match transcriber.generate_subtitles(root).await {
            Ok(()) => {
                info!("Subtitle files generated");
                true
            }
            Err(e) => {
                error!("Subtitle generation failed: {}", e);
                false
            }
        }
    }

    pub async fn process_video(&self, video: &VideoFile) -> Result<VideoOutcome> {
        let name = video.display_name();
        let target = &self.config.translate.target_language;

        if !video.subtitle_path.exists() {
            info!("- {} - .srt file not found", name);
            return Ok(VideoOutcome::SubtitleMissing);
        }

        if video.forced_path.exists() {
            info!("- {} - Found .{}.forced.srt file", name, target);
            return Ok(VideoOutcome::AlreadyProcessed);
        }

        info!("- {} - Found .srt file", name);
        let filter = CaptionFilter::new(
            self.translator.as_ref(),
            FilterSettings::from(&self.config.translate),
        );
        let report = filter.process_file(&video.subtitle_path, &video.forced_path).await?;

        Ok(VideoOutcome::Translated(report))
    }
}
