//! Subforce - forced English subtitles for video folders
//!
//! Runs a speech-to-text tool over a folder of videos, then turns each
//! resulting `.srt` transcript into a `.en.forced.srt` track that only holds
//! the lines spoken in other languages, translated to English.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod forced;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod workflow;
