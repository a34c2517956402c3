//! Subforce - forced English subtitles for video folders
//!
//! Entry point: parses arguments, sets up logging, loads configuration and
//! maps the run outcome to the process exit code.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subforce::cli::{resolve_directory, Args};
use subforce::config::{Config, TranscriberKind};
use subforce::error::SubforceError;
use subforce::workflow::{exit_code_for, Workflow, EXIT_FILE_ERRORS, EXIT_SUCCESS};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = match setup_logging(args.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    };

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<SubforceError>()
                .map(exit_code_for)
                .unwrap_or(EXIT_FILE_ERRORS);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let mut config = load_config(args.config.as_deref())?;

    if args.no_transcribe {
        config.transcriber.kind = TranscriberKind::None;
    }
    if let Some(backend) = args.backend {
        config.translate.backend = backend;
    }
    if let Some(target) = &args.target_lang {
        config.translate.target_language = target.clone();
    }
    config.validate()?;

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("Configuration written to {}", path.display());
        return Ok(EXIT_SUCCESS);
    }

    let root = {
        let mut input = std::io::stdin().lock();
        let mut output = std::io::stdout();
        resolve_directory(args.directory.clone(), &mut input, &mut output, config.cli.max_prompt_attempts)?
    };

    let workflow = Workflow::new(config)?;
    let summary = workflow.run(&root).await?;

    info!("Subforce finished with exit code {}", summary.exit_code());
    Ok(summary.exit_code())
}

/// Explicit path first, then `config.toml` in the working directory, then defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".subforce").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "subforce.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("subforce.log").display());

    Ok(guard)
}
