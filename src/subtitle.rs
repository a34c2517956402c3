use std::fmt;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tokio::fs;
use tracing::debug;

use crate::error::{Result, SubforceError};

static TIMING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})(?:\s.*)?$",
    )
    .expect("timing line pattern is valid")
});

/// One timed text entry of a SubRip file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub index: u32,
    pub start: Duration,
    pub end: Duration,
    pub content: String,
}

impl Caption {
    pub fn new(index: u32, start: Duration, end: Duration, content: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            content: content.into(),
        }
    }

    /// Same index and timing, different text
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            index: self.index,
            start: self.start,
            end: self.end,
            content: content.into(),
        }
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n\n",
            self.index,
            format_timestamp(self.start),
            format_timestamp(self.end),
            legal_content(&self.content)
        )
    }
}

/// Format a duration as a SubRip timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(time: Duration) -> String {
    let total_milliseconds = time.as_millis();
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse SubRip text into captions, in file order.
///
/// Blocks are separated by blank lines. Indices are kept as written, so a
/// file with gaps in its numbering parses to the same gaps.
pub fn parse_srt(content: &str) -> Result<Vec<Caption>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut captions = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_number = 0;

    for line in content.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                block_number += 1;
                captions.push(parse_block(block_number, &block)?);
                block.clear();
            }
        } else {
            block.push(line);
        }
    }

    if !block.is_empty() {
        block_number += 1;
        captions.push(parse_block(block_number, &block)?);
    }

    debug!("Parsed {} captions", captions.len());
    Ok(captions)
}

/// Serialize captions back to SubRip text
pub fn compose_srt(captions: &[Caption]) -> String {
    captions.iter().map(Caption::to_string).collect()
}

pub async fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<Caption>> {
    let content = fs::read_to_string(path.as_ref()).await?;
    parse_srt(&content)
}

pub async fn write_srt_file<P: AsRef<Path>>(path: P, captions: &[Caption]) -> Result<()> {
    fs::write(path.as_ref(), compose_srt(captions)).await?;
    Ok(())
}

fn parse_block(block_number: usize, lines: &[&str]) -> Result<Caption> {
    let index_line = lines[0].trim();
    let index: u32 = index_line
        .parse()
        .map_err(|_| SubforceError::subtitle(block_number, format!("invalid index '{}'", index_line)))?;
    if index == 0 {
        return Err(SubforceError::subtitle(block_number, "index must be positive"));
    }

    let timing_line = lines
        .get(1)
        .ok_or_else(|| SubforceError::subtitle(block_number, "missing timing line"))?;
    let caps = TIMING_LINE
        .captures(timing_line)
        .ok_or_else(|| SubforceError::subtitle(block_number, format!("invalid timing line '{}'", timing_line.trim())))?;

    let start = timestamp_from_captures(block_number, &caps, 1)?;
    let end = timestamp_from_captures(block_number, &caps, 5)?;
    if end < start {
        return Err(SubforceError::subtitle(
            block_number,
            format!("ends at {} before it starts at {}", format_timestamp(end), format_timestamp(start)),
        ));
    }

    let content = lines[2..].join("\n");
    Ok(Caption::new(index, start, end, content))
}

fn timestamp_from_captures(block_number: usize, caps: &Captures<'_>, first: usize) -> Result<Duration> {
    let field = &caps[0];
    let number = |idx: usize| -> Result<u64> {
        caps[idx]
            .parse()
            .map_err(|_| SubforceError::subtitle(block_number, format!("timestamp field '{}' is out of range", &caps[idx])))
    };

    let hours = number(first)?;
    let minutes = number(first + 1)?;
    let seconds = number(first + 2)?;
    if minutes >= 60 || seconds >= 60 {
        return Err(SubforceError::subtitle(
            block_number,
            format!("minutes and seconds must be below 60 in '{}'", field.trim()),
        ));
    }

    // The fractional part is a fraction of a second: ",5" means 500ms
    let fraction = &caps[first + 3];
    let millis = number(first + 3)? * 10u64.pow(3 - fraction.len() as u32);

    hours
        .checked_mul(3600)
        .and_then(|secs| secs.checked_add(minutes * 60 + seconds))
        .and_then(|secs| secs.checked_mul(1000))
        .and_then(|ms| ms.checked_add(millis))
        .map(Duration::from_millis)
        .ok_or_else(|| SubforceError::subtitle(block_number, format!("timestamp too large in '{}'", field.trim())))
}

/// Blank lines would end the block early, so they are dropped from content
fn legal_content(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(ms(0)), "00:00:00,000");
        assert_eq!(format_timestamp(ms(65_123)), "00:01:05,123");
        assert_eq!(format_timestamp(ms(3_661_500)), "01:01:01,500");
    }

    #[test]
    fn test_parse_blocks_and_multiline_content() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n\n\
                     2\n00:00:03,000 --> 00:00:04,500\nHello\nthere\n";
        let captions = parse_srt(input).unwrap();

        assert_eq!(
            captions,
            vec![
                Caption::new(1, ms(1000), ms(2000), "Bonjour"),
                Caption::new(2, ms(3000), ms(4500), "Hello\nthere"),
            ]
        );
    }

    #[test]
    fn test_parse_tolerates_bom_crlf_and_short_fractions() {
        let input = "\u{feff}7\r\n0:00:01.5 --> 00:00:02,25 X1:10 X2:20\r\nSalut\r\n\r\n\r\n";
        let captions = parse_srt(input).unwrap();

        assert_eq!(captions, vec![Caption::new(7, ms(1500), ms(2250), "Salut")]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_srt("").unwrap().is_empty());
        assert!(parse_srt("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_caption_without_text() {
        let captions = parse_srt("3\n00:00:01,000 --> 00:00:01,000\n").unwrap();
        assert_eq!(captions, vec![Caption::new(3, ms(1000), ms(1000), "")]);
    }

    #[test]
    fn test_parse_rejects_bad_index() {
        let err = parse_srt("1\n00:00:01,000 --> 00:00:02,000\nok\n\nabc\n00:00:03,000 --> 00:00:04,000\nbad\n")
            .unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 2, .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_rejects_bad_timing_line() {
        let err = parse_srt("1\n00:00:01 --> 00:00:02\ntext\n").unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 1, .. }));

        let err = parse_srt("1\n").unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_overflowing_hours() {
        let err = parse_srt("1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nx\n").unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 1, .. }), "got {err:?}");

        let err = parse_srt("1\n999999999999999999999999:00:00,000 --> 00:00:01,000\nx\n").unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 1, .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_rejects_minutes_or_seconds_past_59() {
        let err = parse_srt("1\n00:75:00,000 --> 00:76:00,000\nx\n").unwrap_err();
        assert!(err.to_string().contains("below 60"));

        let err = parse_srt("1\n00:00:01,000 --> 00:00:99,000\nx\n").unwrap_err();
        assert!(matches!(err, SubforceError::Subtitle { block: 1, .. }));

        assert!(parse_srt("1\n00:59:59,999 --> 01:00:00,000\nx\n").is_ok());
    }

    #[test]
    fn test_parse_rejects_end_before_start() {
        let err = parse_srt("1\n00:00:05,000 --> 00:00:04,000\ntext\n").unwrap_err();
        assert!(err.to_string().contains("before it starts"));
    }

    #[test]
    fn test_compose_keeps_indices() {
        let captions = vec![
            Caption::new(2, ms(1000), ms(2000), "Hello"),
            Caption::new(9, ms(61_001), ms(62_002), "Two\nlines"),
        ];

        assert_eq!(
            compose_srt(&captions),
            "2\n00:00:01,000 --> 00:00:02,000\nHello\n\n\
             9\n00:01:01,001 --> 00:01:02,002\nTwo\nlines\n\n"
        );
    }

    #[test]
    fn test_compose_output_parses_back() {
        let input = "4\n00:00:01,000 --> 00:00:02,000\nUn\n\n\
                     8\n01:02:03,004 --> 01:02:05,600\n<i>deux</i>\ntrois\n\n";
        let captions = parse_srt(input).unwrap();

        assert_eq!(compose_srt(&captions), input);
        assert_eq!(parse_srt(&compose_srt(&captions)).unwrap(), captions);
    }

    #[test]
    fn test_compose_drops_blank_content_lines() {
        let caption = Caption::new(1, ms(0), ms(1000), "first\n\nsecond");
        let text = compose_srt(std::slice::from_ref(&caption));

        assert_eq!(text, "1\n00:00:00,000 --> 00:00:01,000\nfirst\nsecond\n\n");
        assert_eq!(parse_srt(&text).unwrap()[0].content, "first\nsecond");
    }

    #[tokio::test]
    async fn test_file_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.srt");
        let captions = vec![Caption::new(1, ms(1000), ms(2000), "Hola")];

        write_srt_file(&path, &captions).await.unwrap();
        assert_eq!(read_srt_file(&path).await.unwrap(), captions);
    }
}
