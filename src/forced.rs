//! Forced subtitle generation.
//!
//! A forced track only shows lines the viewer would not otherwise understand.
//! Every caption of the source transcript is classified; captions already in
//! the target language are dropped, the rest are translated, and a caption is
//! kept only when its translation differs from the original text. Kept
//! captions retain their original index and timing.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{FailurePolicy, TranslateConfig};
use crate::error::{Result, SubforceError};
use crate::subtitle::{read_srt_file, write_srt_file, Caption};
use crate::translate::{is_same_language, TranslationProvider};

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub target_language: String,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
    pub concurrency: usize,
    pub on_failure: FailurePolicy,
    pub show_progress: bool,
}

impl From<&TranslateConfig> for FilterSettings {
    fn from(config: &TranslateConfig) -> Self {
        Self {
            target_language: config.target_language.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            concurrency: config.concurrency.max(1),
            on_failure: config.on_failure,
            show_progress: config.show_progress,
        }
    }
}

/// What happened to the captions of one subtitle file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub total: usize,
    /// Detected as the target language
    pub already_target: usize,
    /// Translation came back identical, or the caption was blank
    pub unchanged: usize,
    pub translated: usize,
    /// Indices of captions left out because the provider kept failing
    pub failed: Vec<u32>,
}

#[derive(Debug)]
enum Decision {
    AlreadyTarget,
    Unchanged,
    Translated(Caption),
    Failed(SubforceError),
}

pub struct CaptionFilter<'a> {
    provider: &'a dyn TranslationProvider,
    settings: FilterSettings,
}

impl<'a> CaptionFilter<'a> {
    pub fn new(provider: &'a dyn TranslationProvider, settings: FilterSettings) -> Self {
        Self { provider, settings }
    }

    /// Read `input`, filter it and write the kept captions to `output`.
    ///
    /// The output file is written even when nothing was kept, but never while
    /// a caption is missing because its provider calls failed. Such a file is
    /// an error, so the next run translates it again.
    pub async fn process_file(&self, input: &Path, output: &Path) -> Result<FilterReport> {
        let captions = read_srt_file(input).await?;
        let (kept, report) = self.filter(&captions).await?;

        if !report.failed.is_empty() {
            return Err(SubforceError::Translation(format!(
                "{} of {} captions could not be translated (indices {:?}), {} not written",
                report.failed.len(),
                report.total,
                report.failed,
                output.display()
            )));
        }

        write_srt_file(output, &kept).await?;
        info!("Wrote {} of {} captions to {}", kept.len(), report.total, output.display());
        Ok(report)
    }

    /// Build the forced caption sequence. Output order follows input order
    /// regardless of `concurrency`.
    pub async fn filter(&self, captions: &[Caption]) -> Result<(Vec<Caption>, FilterReport)> {
        let progress = self.progress_bar(captions.len());
        let progress = &progress;

        let decisions: Vec<(u32, Decision)> = stream::iter(captions.iter())
            .map(|caption| async move {
                let decision = self.decide(caption).await;
                progress.inc(1);
                decision.map(|decision| (caption.index, decision))
            })
            .buffered(self.settings.concurrency.max(1))
            .try_collect()
            .await?;
        progress.finish_and_clear();

        let mut report = FilterReport {
            total: captions.len(),
            ..FilterReport::default()
        };
        let mut kept = Vec::new();

        for (index, decision) in decisions {
            match decision {
                Decision::AlreadyTarget => report.already_target += 1,
                Decision::Unchanged => report.unchanged += 1,
                Decision::Translated(caption) => {
                    report.translated += 1;
                    kept.push(caption);
                }
                Decision::Failed(e) => {
                    warn!("Caption {} left out after repeated failures: {}", index, e);
                    report.failed.push(index);
                }
            }
        }

        Ok((kept, report))
    }

    async fn decide(&self, caption: &Caption) -> Result<Decision> {
        if caption.content.trim().is_empty() {
            return Ok(Decision::Unchanged);
        }

        match self.classify_and_translate(caption).await {
            Ok(decision) => Ok(decision),
            Err(e) => match self.settings.on_failure {
                FailurePolicy::Skip => Ok(Decision::Failed(e)),
                FailurePolicy::Abort => {
                    warn!("Caption {} failed, aborting file: {}", caption.index, e);
                    Err(e)
                }
            },
        }
    }

    async fn classify_and_translate(&self, caption: &Caption) -> Result<Decision> {
        let target = self.settings.target_language.as_str();
        let text = caption.content.as_str();

        let detected = self
            .with_retry("detect", || self.provider.detect(text))
            .await?;
        if is_same_language(&detected, target) {
            debug!("Caption {} already in {}", caption.index, target);
            return Ok(Decision::AlreadyTarget);
        }

        let translated = self
            .with_retry("translate", || self.provider.translate(text, "auto", target))
            .await?;

        info!("┌─ Caption {} ({} -> {})", caption.index, detected, target);
        info!("│ Source: {}", text);
        info!("└ Target: {}", translated);

        if translated == caption.content {
            Ok(Decision::Unchanged)
        } else {
            Ok(Decision::Translated(caption.with_content(translated)))
        }
    }

    /// Run `call` under the request timeout, retrying with exponential backoff
    async fn with_retry<F, Fut>(&self, operation: &str, mut call: F) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match timeout(self.settings.request_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(SubforceError::Timeout(self.settings.request_timeout)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.settings.max_attempts => {
                    let delay = self.settings.retry_backoff.saturating_mul(1 << (attempt - 1).min(16));
                    warn!("{} attempt {} failed: {} (retrying in {:?})", operation, attempt, e, delay);
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} Processing Subtitles [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::MockTranslationProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn settings() -> FilterSettings {
        FilterSettings {
            target_language: "en".to_string(),
            max_attempts: 3,
            retry_backoff: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            concurrency: 1,
            on_failure: FailurePolicy::Skip,
            show_progress: false,
        }
    }

    fn caption(index: u32, start_ms: u64, content: &str) -> Caption {
        Caption::new(
            index,
            Duration::from_millis(start_ms),
            Duration::from_millis(start_ms + 1000),
            content,
        )
    }

    /// French lines translate through a tiny dictionary, everything else is English
    fn dictionary_provider() -> MockTranslationProvider {
        let mut provider = MockTranslationProvider::new();
        provider.expect_detect().returning(|text| {
            let lang = match text {
                "Bonjour" | "Merci" | "OK" => "fr",
                "Hola" => "es-419",
                _ => "en",
            };
            Ok(lang.to_string())
        });
        provider.expect_translate().returning(|text, source, target| {
            assert_eq!(source, "auto");
            assert_eq!(target, "en");
            Ok(match text {
                "Bonjour" => "Hello",
                "Merci" => "Thank you",
                "Hola" => "Hi",
                other => other,
            }
            .to_string())
        });
        provider
    }

    fn transient_error() -> SubforceError {
        SubforceError::Translation("503 Service Unavailable".to_string())
    }

    #[tokio::test]
    async fn test_filter_keeps_only_changed_translations() {
        let provider = dictionary_provider();
        let filter = CaptionFilter::new(&provider, settings());
        let input = vec![
            caption(1, 1000, "Bonjour"),
            caption(2, 3000, "Hello"),
            caption(3, 5000, "OK"),
            caption(4, 7000, "Hola"),
            caption(5, 9000, "   "),
        ];

        let (kept, report) = filter.filter(&input).await.unwrap();

        assert_eq!(kept, vec![input[0].with_content("Hello"), input[3].with_content("Hi")]);
        assert_eq!(
            report,
            FilterReport {
                total: 5,
                already_target: 1,
                unchanged: 2,
                translated: 2,
                failed: vec![],
            }
        );
        for out in &kept {
            assert!(input.iter().any(|c| c.index == out.index && c.start == out.start && c.end == out.end));
        }
    }

    #[tokio::test]
    async fn test_target_language_caption_is_never_translated() {
        let mut provider = MockTranslationProvider::new();
        provider.expect_detect().returning(|_| Ok("EN-us".to_string()));
        provider.expect_translate().never();

        let filter = CaptionFilter::new(&provider, settings());
        let (kept, report) = filter.filter(&[caption(1, 0, "Hello there")]).await.unwrap();

        assert!(kept.is_empty());
        assert_eq!(report.already_target, 1);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut provider = MockTranslationProvider::new();
        provider.expect_detect().returning(|_| Ok("fr".to_string()));
        provider.expect_translate().returning(move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient_error())
            } else {
                Ok("Hello".to_string())
            }
        });

        let filter = CaptionFilter::new(&provider, settings());
        let (kept, report) = filter.filter(&[caption(1, 0, "Bonjour")]).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(kept[0].content, "Hello");
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_skip_policy_flags_failed_caption() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        // The first caption uses up all three attempts
        let mut provider = MockTranslationProvider::new();
        provider.expect_detect().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(transient_error())
            } else {
                Ok("fr".to_string())
            }
        });
        provider.expect_translate().returning(|_, _, _| Ok("Thank you".to_string()));

        let filter = CaptionFilter::new(&provider, settings());
        let input = vec![caption(4, 0, "Bonjour"), caption(6, 2000, "Merci")];
        let (kept, report) = filter.filter(&input).await.unwrap();

        assert_eq!(report.failed, vec![4]);
        assert_eq!(kept, vec![input[1].with_content("Thank you")]);
    }

    #[tokio::test]
    async fn test_abort_policy_fails_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        let output = dir.path().join("movie.en.forced.srt");
        std::fs::write(&input, "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n").unwrap();

        let mut provider = MockTranslationProvider::new();
        provider.expect_detect().returning(|_| Ok("fr".to_string()));
        provider.expect_translate().times(2).returning(|_, _, _| Err(transient_error()));

        let filter = CaptionFilter::new(
            &provider,
            FilterSettings {
                max_attempts: 2,
                on_failure: FailurePolicy::Abort,
                ..settings()
            },
        );

        let err = filter.process_file(&input, &output).await.unwrap_err();
        assert!(matches!(err, SubforceError::Translation(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_skip_policy_does_not_write_incomplete_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        let output = dir.path().join("movie.en.forced.srt");
        std::fs::write(
            &input,
            "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n\n\
             2\n00:00:03,000 --> 00:00:04,000\nMerci\n",
        )
        .unwrap();

        let mut provider = MockTranslationProvider::new();
        provider.expect_detect().returning(|_| Ok("fr".to_string()));
        provider.expect_translate().returning(|text, _, _| {
            if text == "Bonjour" {
                Err(transient_error())
            } else {
                Ok("Thank you".to_string())
            }
        });

        let err = CaptionFilter::new(&provider, settings())
            .process_file(&input, &output)
            .await
            .unwrap_err();

        assert!(matches!(err, SubforceError::Translation(_)));
        assert!(err.to_string().contains("1 of 2 captions"));
        assert!(!output.exists());
    }

    struct SlowProvider;

    #[async_trait]
    impl TranslationProvider for SlowProvider {
        async fn detect(&self, _text: &str) -> Result<String> {
            sleep(Duration::from_secs(5)).await;
            Ok("fr".to_string())
        }

        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            Ok(text.to_string())
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failed_attempt() {
        let provider = SlowProvider;
        let filter = CaptionFilter::new(
            &provider,
            FilterSettings {
                max_attempts: 2,
                request_timeout: Duration::from_millis(20),
                ..settings()
            },
        );

        let (kept, report) = filter.filter(&[caption(9, 0, "Bonjour")]).await.unwrap();
        assert!(kept.is_empty());
        assert_eq!(report.failed, vec![9]);
    }

    /// Later captions answer faster, so completion order is reversed
    struct StaggeredProvider {
        total: u64,
    }

    #[async_trait]
    impl TranslationProvider for StaggeredProvider {
        async fn detect(&self, _text: &str) -> Result<String> {
            Ok("de".to_string())
        }

        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            let position: u64 = text.trim_start_matches("Zeile ").parse().unwrap_or(0);
            sleep(Duration::from_millis((self.total - position) * 10)).await;
            Ok(format!("Line {}", position))
        }
    }

    #[tokio::test]
    async fn test_concurrency_preserves_order() {
        let provider = StaggeredProvider { total: 8 };
        let filter = CaptionFilter::new(&provider, FilterSettings { concurrency: 4, ..settings() });
        let input: Vec<Caption> = (1..=8)
            .map(|i| caption(i * 2, u64::from(i) * 1000, &format!("Zeile {}", i)))
            .collect();

        let (kept, report) = filter.filter(&input).await.unwrap();

        let indices: Vec<u32> = kept.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![2, 4, 6, 8, 10, 12, 14, 16]);
        assert_eq!(kept[0].content, "Line 1");
        assert_eq!(report.translated, 8);
    }

    #[tokio::test]
    async fn test_process_file_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("movie.srt");
        std::fs::write(
            &input,
            "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n\n\
             2\n00:00:03,000 --> 00:00:04,000\nHello\n\n\
             3\n00:00:05,000 --> 00:00:06,000\nMerci\n\n",
        )
        .unwrap();

        let provider = dictionary_provider();
        let filter = CaptionFilter::new(&provider, settings());
        let first = dir.path().join("first.srt");
        let second = dir.path().join("second.srt");

        filter.process_file(&input, &first).await.unwrap();
        filter.process_file(&input, &second).await.unwrap();

        let first = std::fs::read(&first).unwrap();
        assert_eq!(first, std::fs::read(&second).unwrap());
        assert_eq!(
            String::from_utf8(first).unwrap(),
            "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
             3\n00:00:05,000 --> 00:00:06,000\nThank you\n\n"
        );
    }

    #[tokio::test]
    async fn test_empty_result_still_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("talk.srt");
        let output = dir.path().join("talk.en.forced.srt");
        std::fs::write(&input, "1\n00:00:01,000 --> 00:00:02,000\nHello\n").unwrap();

        let provider = dictionary_provider();
        let report = CaptionFilter::new(&provider, settings())
            .process_file(&input, &output)
            .await
            .unwrap();

        assert_eq!(report.already_target, 1);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }

    #[tokio::test]
    async fn test_malformed_subtitle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.srt");
        std::fs::write(&input, "one\nnot a timestamp\ntext\n").unwrap();

        let provider = MockTranslationProvider::new();
        let err = CaptionFilter::new(&provider, settings())
            .process_file(&input, &dir.path().join("bad.en.forced.srt"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 1, .. }));
    }
}
