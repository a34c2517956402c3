use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::TranslationBackend;
use crate::error::{Result, SubforceError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Folder containing video files (prompted for when omitted)
    pub directory: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only translate existing subtitles, do not run the transcription tool
    #[arg(long)]
    pub no_transcribe: bool,

    /// Translation backend, overriding the configuration file
    #[arg(long, value_enum)]
    pub backend: Option<TranslationBackend>,

    /// Target language code, overriding the configuration file
    #[arg(long)]
    pub target_lang: Option<String>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,
}

const FIRST_PROMPT: &str = "Please enter the folder path containing video files: ";
const RETRY_PROMPT: &str = "Invalid folder path. Please enter a valid folder path: ";

/// Settle on an existing directory, starting from the command-line value.
///
/// Asks on `output` and reads answers from `input` until one names a
/// directory. Gives up after `max_reprompts` invalid answers or when input
/// ends.
pub fn resolve_directory<R: BufRead, W: Write>(
    directory: Option<PathBuf>,
    input: &mut R,
    output: &mut W,
    max_reprompts: u32,
) -> Result<PathBuf> {
    let mut candidate = match directory {
        Some(dir) => dir,
        None => prompt(input, output, FIRST_PROMPT)?,
    };

    let mut reprompts = 0;
    while !candidate.is_dir() {
        if reprompts >= max_reprompts {
            return Err(SubforceError::InvalidInput(format!(
                "'{}' is not a folder and no valid folder was given after {} attempts",
                candidate.display(),
                reprompts
            )));
        }
        reprompts += 1;
        candidate = prompt(input, output, RETRY_PROMPT)?;
    }

    Ok(candidate)
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<PathBuf> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(SubforceError::InvalidInput("no folder given before end of input".to_string()));
    }

    // Paths pasted from a file manager often arrive quoted
    let answer = line.trim().trim_matches('"').trim_matches('\'');
    Ok(PathBuf::from(answer))
}
