use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// A video together with the subtitle files derived from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    /// `name.srt`, written by the transcription tool
    pub subtitle_path: PathBuf,
    /// `name.<lang>.forced.srt`, written by the caption filter
    pub forced_path: PathBuf,
}

impl VideoFile {
    pub fn new(path: PathBuf, target_language: &str) -> Self {
        let subtitle_path = path.with_extension("srt");
        let forced_path = forced_subtitle_path(&path, target_language);
        Self {
            path,
            subtitle_path,
            forced_path,
        }
    }

    /// File name without its extension, used in progress lines
    pub fn display_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Replace the extension of `path` with `<lang>.forced.srt`
pub fn forced_subtitle_path(path: &Path, target_language: &str) -> PathBuf {
    path.with_extension(format!("{}.forced.srt", target_language))
}

/// Recursively collect every file under `root` whose lowercase extension is
/// in `extensions`.
///
/// Paths are absolute and rooted at the canonical form of `root`. Errors met
/// while walking are returned rather than skipped.
pub fn discover_videos<P: AsRef<Path>>(root: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let root = std::fs::canonicalize(root.as_ref())?;
    let mut video_files = Vec::new();

    for entry in WalkDir::new(&root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_video_extension(entry.path(), extensions) {
            video_files.push(entry.into_path());
        }
    }

    debug!("Discovered {} video files under {}", video_files.len(), root.display());
    Ok(video_files)
}

fn has_video_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
