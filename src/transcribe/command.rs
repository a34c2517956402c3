use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubforceError};

/// External tool invocation: binary, arguments and a description for errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl ToolCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// `--name value`
    pub fn option<S1: Into<String>, S2: Into<String>>(self, name: S1, value: S2) -> Self {
        self.arg(name).arg(value)
    }

    /// `--name`, only when `enabled`
    pub fn flag_if<S: Into<String>>(self, enabled: bool, name: S) -> Self {
        if enabled { self.arg(name) } else { self }
    }

    /// Run to completion with inherited stdio so the tool's own progress
    /// output reaches the terminal.
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing: {} {:?}", self.binary_path, self.args);

        let status = Command::new(&self.binary_path)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| SubforceError::Transcriber(format!(
                "Failed to execute {} ({}): {}",
                self.description, self.binary_path, e
            )))?;

        if !status.success() {
            return Err(SubforceError::Transcriber(format!(
                "{} failed: {}",
                self.description, status
            )));
        }

        Ok(())
    }
}
